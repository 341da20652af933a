use rowmap::Record;

#[derive(Record)]
struct Wrapper<T> {
    #[rowmap(db = "inner")]
    inner: T,
}

fn main() {}
