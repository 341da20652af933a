use rowmap::Record;

#[derive(Record)]
struct Order {
    #[rowmap(db = "created_at", created_at)]
    created_at: i64,
    #[rowmap(db = "inserted_at", created_at)]
    inserted_at: i64,
}

fn main() {}
