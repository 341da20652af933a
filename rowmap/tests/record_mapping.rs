use std::any::TypeId;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rowmap::{
    Column, MapOptions, Mapper, NameTransform, Record, Value,
    record::{FieldShape, RecordShape},
    value::Json,
};
use serde::Serialize;

#[derive(Record)]
struct Account {
    #[rowmap(db = "id,omitempty")]
    id: i64,
    #[rowmap(db = "name")]
    name: String,
}

#[test]
fn zero_id_is_omitted() {
    let out = Mapper::new()
        .map(&Account {
            id: 0,
            name: "joe".into(),
        })
        .unwrap();
    assert_eq!(out.names, vec!["name"]);
    assert_eq!(out.values, vec![Value::from("joe")]);
}

#[test]
fn non_zero_id_is_included_with_matching_order() {
    let out = Mapper::new()
        .map(&Account {
            id: 5,
            name: "joe".into(),
        })
        .unwrap();
    assert_eq!(out.len(), 2);
    let id = out.names.iter().position(|n| n == "id").unwrap();
    let name = out.names.iter().position(|n| n == "name").unwrap();
    assert_eq!(out.values[id], Value::Int(5));
    assert_eq!(out.values[name], Value::from("joe"));
}

#[test]
fn omit_law_binds_default_never_zero() {
    let mapper = Mapper::new();
    let account = Account {
        id: 0,
        name: "joe".into(),
    };

    let omitted = mapper.project(&account, MapOptions::default()).unwrap();
    assert!(omitted.get("id").is_none());

    let included = mapper
        .project(
            &account,
            MapOptions {
                include_zeroed: true,
                include_nil: false,
            },
        )
        .unwrap();
    assert_eq!(included.get("id"), Some(&Value::Default));
    assert!(included.values.iter().all(|v| *v != Value::Int(0)));
}

#[test]
fn projection_order_is_stable() {
    let mapper = Mapper::new();
    let a = mapper
        .map(&Account {
            id: 3,
            name: "x".into(),
        })
        .unwrap();
    let b = mapper
        .map(&Account {
            id: 3,
            name: "x".into(),
        })
        .unwrap();
    assert_eq!(a.names, b.names);
    assert_eq!(a, b);
}

#[derive(Record)]
struct Audit {
    #[rowmap(db = "created_by")]
    created_by: String,
    #[rowmap(db = "name")]
    name: String,
}

#[derive(Record)]
struct Settings {
    #[rowmap(db = "theme,omitempty")]
    theme: String,
}

#[derive(Debug, Default, Serialize)]
struct Preferences {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    languages: Vec<String>,
}

#[derive(Record)]
#[rowmap(table = "members")]
struct Member {
    #[rowmap(db = "id,omitempty")]
    id: i64,
    #[rowmap(db = "name")]
    name: String,
    #[rowmap(embed)]
    audit: Audit,
    #[rowmap(embed, db = "settings")]
    settings: Option<Settings>,
    #[rowmap(db = "prefs,omitempty")]
    prefs: Json<Preferences>,
    #[rowmap(db = "joined_at,omitempty")]
    joined_at: Option<DateTime<Utc>>,
}

fn member() -> Member {
    Member {
        id: 1,
        name: "outer".into(),
        audit: Audit {
            created_by: "admin".into(),
            name: "inner".into(),
        },
        settings: None,
        prefs: Json(Preferences::default()),
        joined_at: None,
    }
}

#[test]
fn embedded_fields_flatten_and_shadow() {
    let out = Mapper::new().map(&member()).unwrap();
    // `settings.theme` sits under an empty optional parent and reads as its zero value,
    // which `omitempty` leaves out.
    assert_eq!(out.names, vec!["created_by", "id", "name"]);
    // The outer `name` shadows the embedded one.
    assert_eq!(out.get("name"), Some(&Value::from("outer")));
}

#[test]
fn missing_parent_child_uses_default_when_zeroes_are_included() {
    let out = Mapper::new()
        .project(&member(), MapOptions::default().include_zeroed().include_nil())
        .unwrap();
    assert_eq!(out.get("settings.theme"), Some(&Value::Default));
    assert_eq!(out.get("prefs"), Some(&Value::Default));
    assert_eq!(out.get("joined_at"), Some(&Value::Default));
}

#[test]
fn snake_case_transform_names_unannotated_fields() {
    let mapper = Mapper::with_key("sql").with_transform(NameTransform::SnakeCase);
    let index = mapper.lookup::<Member>();
    assert!(index.get_by_path("joined_at").is_some());
    assert!(index.get_by_path("created_by").is_some());
    // Nothing carries a `sql` annotation, so nothing is projected.
    assert!(mapper.map(&member()).unwrap().is_empty());
}

// A leaf type that decides its own emptiness.
#[derive(Debug, Clone, PartialEq)]
struct Money {
    cents: i64,
    currency: &'static str,
}

impl Column for Money {
    fn to_value(&self) -> Value {
        Value::Text(format!("{} {}", self.cents, self.currency))
    }

    fn is_zero(&self) -> bool {
        self.cents == 0
    }
}

impl rowmap::ColumnType for Money {
    const ZERO_CHECK: rowmap::value::ZeroCheck = rowmap::value::ZeroCheck::Custom;

    fn zero_value() -> Value {
        Value::Text("0".into())
    }
}

// Hand-written impl: the manual registration path.
struct Invoice {
    number: String,
    total: Money,
}

impl Record for Invoice {
    fn record_shape() -> RecordShape {
        RecordShape::new::<Self>(
            "Invoice",
            vec![
                FieldShape::column::<String>("number", &[("db", "number")]),
                FieldShape::column::<Money>("total", &[("db", "total,omitempty")]),
            ],
        )
        .with_table("invoices")
    }

    fn shape(&self) -> RecordShape {
        Self::record_shape()
    }

    fn record_type_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    fn column(&self, offset: usize) -> Option<&dyn Column> {
        match offset {
            0 => Some(&self.number),
            1 => Some(&self.total),
            _ => None,
        }
    }

    fn embedded(&self, _offset: usize) -> Option<&dyn Record> {
        None
    }
}

#[test]
fn custom_zero_check_and_manual_records() {
    let mapper = Mapper::new();
    let free = Invoice {
        number: "A-1".into(),
        total: Money {
            cents: 0,
            currency: "EUR",
        },
    };
    assert_eq!(mapper.map(&free).unwrap().names, vec!["number"]);

    let paid = Invoice {
        number: "A-2".into(),
        total: Money {
            cents: 1250,
            currency: "EUR",
        },
    };
    let out = mapper.map(&paid).unwrap();
    assert_eq!(out.get("total"), Some(&Value::from("1250 EUR")));
    assert_eq!(mapper.lookup::<Invoice>().table(), Some("invoices"));
}

#[test]
fn shared_mapper_serves_many_threads() {
    let mapper = Arc::new(Mapper::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let mapper = Arc::clone(&mapper);
            std::thread::spawn(move || {
                mapper
                    .map(&Account {
                        id: i,
                        name: format!("user{i}"),
                    })
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        let out = handle.join().unwrap();
        assert!(out.names.contains(&"name".to_string()));
    }
    assert_eq!(mapper.cached_types(), 1);
}

#[test]
fn global_mapper_is_shared() {
    assert!(std::ptr::eq(Mapper::global(), Mapper::global()));
    assert!(Mapper::global().warm_up() >= 3);
}

#[derive(Record)]
struct Ledger {
    #[rowmap(db = "balance,omitempty")]
    balance: u64,
    #[rowmap(db = "supply")]
    supply: u128,
}

#[test]
fn wide_integers_project_as_numeric() {
    let mapper = Mapper::new();
    let out = mapper
        .map(&Ledger {
            balance: 0,
            supply: u128::MAX,
        })
        .unwrap();
    assert_eq!(out.names, vec!["supply"]);
    assert_eq!(out.values, vec![Value::Numeric(u128::MAX.to_string())]);

    let out = mapper
        .map(&Ledger {
            balance: u64::MAX,
            supply: 0,
        })
        .unwrap();
    assert_eq!(out.get("balance"), Some(&Value::Numeric("18446744073709551615".into())));
    assert_eq!(out.get("supply"), Some(&Value::Numeric("0".into())));
}
