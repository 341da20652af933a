use rowmap::Record;

#[derive(Record)]
enum Status {
    Active,
    Closed,
}

fn main() {}
