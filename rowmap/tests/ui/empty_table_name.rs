use rowmap::Record;

#[derive(Record)]
#[rowmap(table = "")]
struct User {
    #[rowmap(db = "id")]
    id: i64,
}

fn main() {}
