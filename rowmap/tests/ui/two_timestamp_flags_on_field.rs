use rowmap::Record;

#[derive(Record)]
struct Order {
    #[rowmap(db = "stamped_at", created_at, updated_at)]
    stamped_at: i64,
}

fn main() {}
