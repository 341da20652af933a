use rowmap::Record;

#[derive(Record)]
#[rowmap(schema = "public")]
struct User {
    #[rowmap(db = "id")]
    id: i64,
}

fn main() {}
