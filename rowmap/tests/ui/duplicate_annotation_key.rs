use rowmap::Record;

#[derive(Record)]
struct User {
    #[rowmap(db = "id", db = "user_id")]
    id: i64,
}

fn main() {}
