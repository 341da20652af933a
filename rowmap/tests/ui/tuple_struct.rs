use rowmap::Record;

#[derive(Record)]
struct Pair(i64, String);

fn main() {}
