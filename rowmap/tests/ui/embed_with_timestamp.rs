use rowmap::Record;

#[derive(Record)]
struct Order {
    #[rowmap(db = "id")]
    id: i64,
    #[rowmap(embed, created_at)]
    audit: i64,
}

fn main() {}
