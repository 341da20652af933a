use rowmap::Record;

#[derive(Record)]
struct Draft {
    #[rowmap(db = "id")]
    id: i64,
    #[rowmap(skip, db = "scratch")]
    scratch: String,
}

fn main() {}
