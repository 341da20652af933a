//! Predicate expressions and their compilation into parameterized SQL.
//!
//! An [`Expr`] tree compiles into a [`Fragment`]: SQL text using `?` as the positional
//! marker plus the arguments in marker order. `??` is an escaped literal question mark and
//! binds nothing.
//!
//! # Examples
//!
//! ```
//! use rowmap::cond::{Compile, Expr};
//! use rowmap::Value;
//!
//! let active = Expr::and([
//!     Expr::cond([("status", Expr::eq("active"))]),
//!     Expr::cond([("deleted_at", Expr::is_null())]),
//!     Expr::cond([("id", Expr::in_list([1, 2, 3]))]),
//! ]);
//!
//! let fragment = active.compile().unwrap();
//! assert_eq!(fragment.sql, "(status = ? AND deleted_at IS NULL AND id IN (?, ?, ?))");
//! assert_eq!(fragment.args.len(), 4);
//! assert_eq!(fragment.args[0], Value::from("active"));
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Position, Result, RowmapError};
use crate::value::Value;

pub const MARKER: char = '?';

const IN: &str = "IN";
const NOT_IN: &str = "NOT IN";

/// Anything that renders into a parameterized SQL fragment.
pub trait Compile {
    fn compile(&self) -> Result<Fragment>;
}

/// Compiled SQL text and its positional arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self { sql: sql.into(), args }
    }

    pub fn text(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    pub fn marker(value: Value) -> Self {
        Self::new(MARKER.to_string(), vec![value])
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Wraps the text in parentheses, keeping the arguments.
    pub fn parenthesized(self) -> Self {
        Self {
            sql: format!("({})", self.sql),
            args: self.args,
        }
    }

    /// Number of binding markers in the text.
    pub fn marker_count(&self) -> usize {
        count_markers(&self.sql)
    }
}

/// Counts `?` markers, treating `??` as one escaped literal.
pub fn count_markers(sql: &str) -> usize {
    let mut count = 0;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        if c == MARKER {
            if chars.peek() == Some(&MARKER) {
                chars.next();
            } else {
                count += 1;
            }
        }
    }
    count
}

/// Comparison operator carried by a [`Expr::Leaf`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    #[serde(rename = "ilike")]
    ILike,
    #[serde(rename = "not_ilike")]
    NotILike,
    IsNull,
    IsNotNull,
    /// Any other operator text, rendered verbatim.
    Custom(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::ILike => "ILIKE",
            Operator::NotILike => "NOT ILIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Custom(op) => op,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    fn separator(self) -> &'static str {
        match self {
            Combinator::And => " AND ",
            Combinator::Or => " OR ",
        }
    }

    // What an empty group means: AND of nothing holds, OR of nothing does not.
    fn empty(self) -> &'static str {
        match self {
            Combinator::And => "(1=1)",
            Combinator::Or => "(1=0)",
        }
    }
}

/// One side of a binary comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// A column name or other SQL identifier, rendered as is.
    Ident(String),
    Value(Value),
    Expr(Box<Expr>),
}

impl From<&str> for Operand {
    fn from(ident: &str) -> Self {
        Operand::Ident(ident.to_string())
    }
}

impl From<String> for Operand {
    fn from(ident: String) -> Self {
        Operand::Ident(ident)
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<Expr> for Operand {
    fn from(expr: Expr) -> Self {
        Operand::Expr(Box::new(expr))
    }
}

macro_rules! operand_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                #[inline]
                fn from(v: $ty) -> Self {
                    Operand::Value(Value::from(v))
                }
            }
        )*
    };
}

operand_from_value!(bool, i32, i64, u32, f64, Uuid, DateTime<Utc>);

/// Argument of a [`Expr::Func`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arg {
    Value(Value),
    /// A row of values, rendered `(?,?)`.
    Tuple(Vec<Value>),
    Expr(Expr),
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<Expr> for Arg {
    fn from(expr: Expr) -> Self {
        Arg::Expr(expr)
    }
}

/// An externally built fragment, such as a nested `Select`.
#[derive(Clone)]
pub struct SubQuery(pub Arc<dyn Compile + Send + Sync>);

impl fmt::Debug for SubQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SubQuery(..)")
    }
}

impl PartialEq for SubQuery {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A predicate expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Operator plus an optional value. Inside a node the operator joins the two sides.
    Leaf { op: Operator, value: Option<Value> },
    /// Binary comparison. The operator comes from the right side.
    Node { left: Operand, right: Operand },
    Composite { combinator: Combinator, children: Vec<Expr> },
    /// SQL text with its own markers and arguments.
    Raw {
        sql: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    /// `<name> (<args>)`; also how `IN` and `NOT IN` are expressed.
    Func {
        name: String,
        #[serde(default)]
        args: Vec<Arg>,
    },
    #[serde(skip)]
    Sub(SubQuery),
}

impl Expr {
    // ========== Leaf Constructors ==========

    #[inline]
    pub fn leaf(op: Operator, value: impl Into<Value>) -> Self {
        Self::Leaf {
            op,
            value: Some(value.into()),
        }
    }

    #[inline]
    pub fn eq(value: impl Into<Value>) -> Self {
        Self::leaf(Operator::Eq, value)
    }

    #[inline]
    pub fn not_eq(value: impl Into<Value>) -> Self {
        Self::leaf(Operator::NotEq, value)
    }

    #[inline]
    pub fn gt(value: impl Into<Value>) -> Self {
        Self::leaf(Operator::Gt, value)
    }

    #[inline]
    pub fn gte(value: impl Into<Value>) -> Self {
        Self::leaf(Operator::Gte, value)
    }

    #[inline]
    pub fn lt(value: impl Into<Value>) -> Self {
        Self::leaf(Operator::Lt, value)
    }

    #[inline]
    pub fn lte(value: impl Into<Value>) -> Self {
        Self::leaf(Operator::Lte, value)
    }

    #[inline]
    pub fn like(value: impl Into<Value>) -> Self {
        Self::leaf(Operator::Like, value)
    }

    #[inline]
    pub fn ilike(value: impl Into<Value>) -> Self {
        Self::leaf(Operator::ILike, value)
    }

    #[inline]
    pub fn not_like(value: impl Into<Value>) -> Self {
        Self::leaf(Operator::NotLike, value)
    }

    #[inline]
    pub fn not_ilike(value: impl Into<Value>) -> Self {
        Self::leaf(Operator::NotILike, value)
    }

    #[inline]
    pub fn is_null() -> Self {
        Self::Leaf {
            op: Operator::IsNull,
            value: None,
        }
    }

    #[inline]
    pub fn is_not_null() -> Self {
        Self::Leaf {
            op: Operator::IsNotNull,
            value: None,
        }
    }

    // ========== Set Membership ==========

    pub fn in_list<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::func(IN, values.into_iter().map(|v| Arg::Value(v.into())))
    }

    pub fn not_in_list<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::func(NOT_IN, values.into_iter().map(|v| Arg::Value(v.into())))
    }

    pub fn in_tuples<R, V>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::func(IN, rows.into_iter().map(tuple_arg))
    }

    pub fn not_in_tuples<R, V>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::func(NOT_IN, rows.into_iter().map(tuple_arg))
    }

    pub fn in_query(query: impl Compile + Send + Sync + 'static) -> Self {
        Self::func(IN, [Arg::Expr(Self::sub(query))])
    }

    pub fn not_in_query(query: impl Compile + Send + Sync + 'static) -> Self {
        Self::func(NOT_IN, [Arg::Expr(Self::sub(query))])
    }

    // ========== Composition ==========

    pub fn raw(sql: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        Self::Raw {
            sql: sql.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn func(name: impl Into<String>, args: impl IntoIterator<Item = Arg>) -> Self {
        Self::Func {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn sub(query: impl Compile + Send + Sync + 'static) -> Self {
        Self::Sub(SubQuery(Arc::new(query)))
    }

    pub fn node(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Self::Node {
            left: left.into(),
            right: right.into(),
        }
    }

    #[inline]
    pub fn and(children: impl IntoIterator<Item = Expr>) -> Self {
        Self::Composite {
            combinator: Combinator::And,
            children: children.into_iter().collect(),
        }
    }

    #[inline]
    pub fn or(children: impl IntoIterator<Item = Expr>) -> Self {
        Self::Composite {
            combinator: Combinator::Or,
            children: children.into_iter().collect(),
        }
    }

    /// One comparison per `(left, right)` pair. A single pair is a bare node; several are
    /// joined with AND.
    pub fn cond<L, R>(pairs: impl IntoIterator<Item = (L, R)>) -> Self
    where
        L: Into<Operand>,
        R: Into<Operand>,
    {
        let mut nodes: Vec<Expr> = pairs.into_iter().map(|(l, r)| Self::node(l, r)).collect();
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Self::and(nodes)
        }
    }
}

fn tuple_arg<R, V>(row: R) -> Arg
where
    R: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Arg::Tuple(row.into_iter().map(Into::into).collect())
}

impl Compile for Expr {
    fn compile(&self) -> Result<Fragment> {
        match self {
            Expr::Leaf { op, value } => Ok(match value {
                Some(value) => Fragment::marker(value.clone()),
                None => Fragment::text(op.as_str()),
            }),
            Expr::Node { left, right } => compile_node(left, right),
            Expr::Composite { combinator, children } => compile_composite(*combinator, children),
            Expr::Raw { sql, args } => compile_raw(sql, args),
            Expr::Func { name, args } => compile_func(name, args),
            Expr::Sub(query) => query.0.compile().map_err(|err| err.at(Position::Subquery)),
        }
    }
}

impl Compile for Fragment {
    fn compile(&self) -> Result<Fragment> {
        Ok(self.clone())
    }
}

impl<T: Compile + ?Sized> Compile for Box<T> {
    fn compile(&self) -> Result<Fragment> {
        (**self).compile()
    }
}

impl<T: Compile + ?Sized> Compile for Arc<T> {
    fn compile(&self) -> Result<Fragment> {
        (**self).compile()
    }
}

fn compile_node(left: &Operand, right: &Operand) -> Result<Fragment> {
    if let Operand::Ident(name) = left {
        match right {
            Operand::Value(value) => return Ok(compile_equality(name, value)),
            Operand::Ident(text) => return Ok(compile_equality(name, &Value::Text(text.clone()))),
            Operand::Expr(_) => {}
        }
    }

    let left_frag = compile_operand(left).map_err(|err| err.at(Position::Left))?;
    let right_frag = compile_operand(right).map_err(|err| err.at(Position::Right))?;

    let mut sql = left_frag.sql;
    if let Some(op) = operator_of(right) {
        sql.push(' ');
        sql.push_str(op);
    }

    let mut args = left_frag.args;
    if !right_frag.is_empty() {
        sql.push(' ');
        sql.push_str(&right_frag.sql);
        args.extend(right_frag.args);
    }

    Ok(Fragment { sql, args })
}

// Column-equals-value shorthand. NULL and lists follow the usual equality-map rendering.
fn compile_equality(name: &str, value: &Value) -> Fragment {
    match value {
        Value::Null => Fragment::text(format!("{name} IS NULL")),
        Value::Array(items) if items.is_empty() => Fragment::text("(1=0)"),
        Value::Array(items) => {
            let markers = vec![MARKER.to_string(); items.len()].join(",");
            Fragment::new(format!("{name} IN ({markers})"), items.clone())
        }
        other => Fragment::new(format!("{name} = {MARKER}"), vec![other.clone()]),
    }
}

fn operator_of(right: &Operand) -> Option<&str> {
    match right {
        Operand::Expr(expr) => match expr.as_ref() {
            Expr::Leaf { op, .. } => Some(op.as_str()),
            // Raw text and function calls carry their own operator.
            Expr::Raw { .. } | Expr::Func { .. } => None,
            _ => Some("="),
        },
        _ => Some("="),
    }
}

fn compile_operand(operand: &Operand) -> Result<Fragment> {
    match operand {
        Operand::Ident(ident) => Ok(Fragment::text(ident.clone())),
        Operand::Value(value) => Ok(Fragment::marker(value.clone())),
        Operand::Expr(expr) => match expr.as_ref() {
            Expr::Leaf { value, .. } => Ok(match value {
                Some(value) => Fragment::marker(value.clone()),
                None => Fragment::default(),
            }),
            Expr::Raw { .. } | Expr::Func { .. } | Expr::Composite { .. } => expr.compile(),
            Expr::Node { .. } | Expr::Sub(_) => expr.compile().map(Fragment::parenthesized),
        },
    }
}

fn compile_composite(combinator: Combinator, children: &[Expr]) -> Result<Fragment> {
    let mut parts = Vec::with_capacity(children.len());
    let mut args = Vec::new();
    for (i, child) in children.iter().enumerate() {
        let fragment = child.compile().map_err(|err| err.at(Position::Node(i)))?;
        if fragment.is_empty() {
            continue;
        }
        parts.push(fragment.sql);
        args.extend(fragment.args);
    }

    if parts.is_empty() {
        return Ok(Fragment::text(combinator.empty()));
    }
    Ok(Fragment::new(format!("({})", parts.join(combinator.separator())), args))
}

fn compile_raw(sql: &str, args: &[Value]) -> Result<Fragment> {
    let markers = count_markers(sql);
    if markers != args.len() {
        return Err(RowmapError::invalid_expression(format!(
            "raw fragment `{sql}` has {markers} markers but {} arguments",
            args.len()
        )));
    }
    Ok(Fragment::new(sql, args.to_vec()))
}

fn compile_func(name: &str, args: &[Arg]) -> Result<Fragment> {
    if args.is_empty() {
        return Ok(Fragment::text(format!("{name} ()")));
    }

    // A list of lists is a row list and renders compactly: `IN ((?,?),(?,?))`. Arrays then
    // expand into rows too.
    let rows = matches!(args.first(), Some(Arg::Tuple(_) | Arg::Value(Value::Array(_))));
    let mut places = Vec::with_capacity(args.len());
    let mut values = Vec::new();

    for (index, arg) in args.iter().enumerate() {
        match arg {
            Arg::Tuple(row) => {
                let markers = vec![MARKER.to_string(); row.len()].join(",");
                places.push(format!("({markers})"));
                values.extend(row.iter().cloned());
            }
            Arg::Value(Value::Array(row)) if rows => {
                let markers = vec![MARKER.to_string(); row.len()].join(",");
                places.push(format!("({markers})"));
                values.extend(row.iter().cloned());
            }
            Arg::Value(value) => {
                places.push(MARKER.to_string());
                values.push(value.clone());
            }
            Arg::Expr(expr) => {
                let fragment = expr.compile().map_err(|err| {
                    err.at(Position::Argument {
                        function: name.to_string(),
                        index,
                    })
                })?;
                places.push(fragment.sql);
                values.extend(fragment.args);
            }
        }
    }

    let separator = if rows { "," } else { ", " };
    Ok(Fragment::new(format!("{name} ({})", places.join(separator)), values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(expr: &Expr) -> (String, Vec<Value>) {
        let fragment = expr.compile().unwrap();
        assert_eq!(fragment.marker_count(), fragment.args.len(), "{}", fragment.sql);
        (fragment.sql, fragment.args)
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Int).collect()
    }

    #[test]
    fn equal_to() {
        let (sql, args) = compiled(&Expr::cond([("one", 1)]));
        assert_eq!(sql, "one = ?");
        assert_eq!(args, ints(&[1]));
    }

    #[test]
    fn equal_to_inverted() {
        let (sql, args) = compiled(&Expr::node(Value::Int(1), "one"));
        assert_eq!(sql, "? = one");
        assert_eq!(args, ints(&[1]));
    }

    #[test]
    fn shorthand_null_and_lists() {
        assert_eq!(compiled(&Expr::cond([("a", Value::Null)])).0, "a IS NULL");
        let (sql, args) = compiled(&Expr::cond([("a", Value::from(vec![1i64, 2]))]));
        assert_eq!(sql, "a IN (?,?)");
        assert_eq!(args, ints(&[1, 2]));
        assert_eq!(compiled(&Expr::cond([("a", Value::Array(vec![]))])).0, "(1=0)");
    }

    #[test]
    fn comparison_operators() {
        let (sql, args) = compiled(&Expr::cond([("id", Expr::lte(1))]));
        assert_eq!(sql, "id <= ?");
        assert_eq!(args, ints(&[1]));

        assert_eq!(compiled(&Expr::cond([("name", Expr::like("john"))])).0, "name LIKE ?");
        assert_eq!(compiled(&Expr::cond([("name", Expr::not_ilike("j%"))])).0, "name NOT ILIKE ?");
        assert_eq!(compiled(&Expr::cond([("n", Expr::not_eq(2))])).0, "n <> ?");
    }

    #[test]
    fn single_leaf() {
        let (sql, args) = compiled(&Expr::lte(1));
        assert_eq!(sql, "?");
        assert_eq!(args, ints(&[1]));

        let (sql, args) = compiled(&Expr::is_not_null());
        assert_eq!(sql, "IS NOT NULL");
        assert!(args.is_empty());
    }

    #[test]
    fn is_null() {
        let (sql, args) = compiled(&Expr::cond([("status", Expr::is_null())]));
        assert_eq!(sql, "status IS NULL");
        assert!(args.is_empty());
    }

    #[test]
    fn and_of_conditions() {
        let expr = Expr::and([Expr::cond([("one", 1)]), Expr::cond([("two", 2)])]);
        let (sql, args) = compiled(&expr);
        assert_eq!(sql, "(one = ? AND two = ?)");
        assert_eq!(args, ints(&[1, 2]));
    }

    #[test]
    fn multiple_pairs_join_with_and() {
        let expr = Expr::cond([("a", Expr::gt(1)), ("b", Expr::lt(9))]);
        let (sql, args) = compiled(&expr);
        assert_eq!(sql, "(a > ? AND b < ?)");
        assert_eq!(args, ints(&[1, 9]));
    }

    #[test]
    fn empty_composites() {
        assert_eq!(compiled(&Expr::and([])).0, "(1=1)");
        assert_eq!(compiled(&Expr::or([])).0, "(1=0)");
        // Children that render nothing are skipped.
        let expr = Expr::or([Expr::raw("", []), Expr::cond([("a", 1)])]);
        assert_eq!(compiled(&expr).0, "(a = ?)");
    }

    #[test]
    fn nested_composites_keep_argument_order() {
        let expr = Expr::or([
            Expr::and([Expr::cond([("a", 1)]), Expr::cond([("b", 2)])]),
            Expr::cond([("c", Expr::gte(3))]),
        ]);
        let (sql, args) = compiled(&expr);
        assert_eq!(sql, "((a = ? AND b = ?) OR c >= ?)");
        assert_eq!(args, ints(&[1, 2, 3]));
    }

    #[test]
    fn in_with_values() {
        let (sql, args) = compiled(&Expr::cond([("list", Expr::in_list([1i64, 2, 3]))]));
        assert_eq!(sql, "list IN (?, ?, ?)");
        assert_eq!(args, ints(&[1, 2, 3]));

        let (sql, args) = compiled(&Expr::cond([("list", Expr::not_in_list(["Czech Republic", "Slovakia"]))]));
        assert_eq!(sql, "list NOT IN (?, ?)");
        assert_eq!(args, vec![Value::from("Czech Republic"), Value::from("Slovakia")]);
    }

    #[test]
    fn in_with_empty_list() {
        let (sql, args) = compiled(&Expr::cond([("list", Expr::in_list(Vec::<i64>::new()))]));
        assert_eq!(sql, "list IN ()");
        assert!(args.is_empty());
        assert_eq!(compiled(&Expr::cond([("list", Expr::not_in_list(Vec::<i64>::new()))])).0, "list NOT IN ()");
    }

    #[test]
    fn in_with_tuples() {
        let (sql, args) = compiled(&Expr::cond([("list", Expr::in_tuples([vec![1i64, 2], vec![3, 4]]))]));
        assert_eq!(sql, "list IN ((?,?),(?,?))");
        assert_eq!(args, ints(&[1, 2, 3, 4]));

        // Row arity may vary.
        let (sql, args) = compiled(&Expr::cond([("t", Expr::not_in_tuples([vec![1i64], vec![2, 3, 4]]))]));
        assert_eq!(sql, "t NOT IN ((?),(?,?,?))");
        assert_eq!(args, ints(&[1, 2, 3, 4]));
    }

    #[test]
    fn list_of_lists_expands_into_rows() {
        let (sql, args) = compiled(&Expr::cond([("list", Expr::in_list([vec![1i64, 2], vec![3, 4]]))]));
        assert_eq!(sql, "list IN ((?,?),(?,?))");
        assert_eq!(args, ints(&[1, 2, 3, 4]));

        let expr: Expr = serde_json::from_value(serde_json::json!({
            "func": {
                "name": "IN",
                "args": [{"value": Value::from(vec![5i64, 6])}, {"value": Value::from(vec![7i64])}]
            }
        }))
        .unwrap();
        let (sql, args) = compiled(&expr);
        assert_eq!(sql, "IN ((?,?),(?))");
        assert_eq!(args, ints(&[5, 6, 7]));

        // An array after a scalar binds as a single value.
        let (sql, args) = compiled(&Expr::func("f", [Arg::Value(Value::Int(1)), Arg::Value(Value::from(vec![2i64]))]));
        assert_eq!(sql, "f (?, ?)");
        assert_eq!(args, vec![Value::Int(1), Value::from(vec![2i64])]);
    }

    #[test]
    fn raw_right_side_carries_operator() {
        let expr = Expr::cond([(
            "salary",
            Expr::raw("> ANY(SELECT salary FROM managers WHERE id < ?)", [Value::Int(23)]),
        )]);
        let (sql, args) = compiled(&expr);
        assert_eq!(sql, "salary > ANY(SELECT salary FROM managers WHERE id < ?)");
        assert_eq!(args, ints(&[23]));
    }

    #[test]
    fn expression_on_the_left() {
        let (sql, args) = compiled(&Expr::node(Expr::raw("ANY(list)", []), Value::Int(1)));
        assert_eq!(sql, "ANY(list) = ?");
        assert_eq!(args, ints(&[1]));

        let any = Expr::func("ANY", [Arg::Expr(Expr::raw("list", []))]);
        let (sql, args) = compiled(&Expr::node(any, Value::Int(1)));
        assert_eq!(sql, "ANY (list) = ?");
        assert_eq!(args, ints(&[1]));

        let (sql, _) = compiled(&Expr::node(Expr::raw("ANY(list)", []), Expr::not_eq(1)));
        assert_eq!(sql, "ANY(list) <> ?");
    }

    #[test]
    fn functions() {
        assert_eq!(compiled(&Expr::func("NOW", [])).0, "NOW ()");
        let expr = Expr::func(
            "COALESCE",
            [Arg::Expr(Expr::raw("nickname", [])), Arg::Value(Value::from("anon"))],
        );
        let (sql, args) = compiled(&expr);
        assert_eq!(sql, "COALESCE (nickname, ?)");
        assert_eq!(args, vec![Value::from("anon")]);
    }

    #[test]
    fn nested_node_is_parenthesized() {
        let inner = Expr::cond([("a", 1)]);
        let (sql, args) = compiled(&Expr::node("flag", inner));
        assert_eq!(sql, "flag = (a = ?)");
        assert_eq!(args, ints(&[1]));
    }

    #[test]
    fn subquery_in_node_and_in() {
        let query = Fragment::new("SELECT id FROM users WHERE badge = ?", vec![Value::from("admin")]);
        let (sql, args) = compiled(&Expr::node("id", Expr::sub(query.clone())));
        assert_eq!(sql, "id = (SELECT id FROM users WHERE badge = ?)");
        assert_eq!(args, vec![Value::from("admin")]);

        let (sql, _) = compiled(&Expr::cond([("id", Expr::in_query(query))]));
        assert_eq!(sql, "id IN (SELECT id FROM users WHERE badge = ?)");
    }

    #[test]
    fn raw_marker_mismatch_is_rejected_with_position() {
        let expr = Expr::and([
            Expr::cond([("ok", 1)]),
            Expr::cond([("bad", Expr::raw("= ? + ?", [Value::Int(1)]))]),
        ]);
        let err = expr.compile().unwrap_err();
        assert_eq!(
            err.to_string(),
            "error compiling node 1: error compiling right side: invalid expression: \
             raw fragment `= ? + ?` has 2 markers but 1 arguments"
        );
    }

    #[test]
    fn escaped_markers_bind_nothing() {
        assert_eq!(count_markers("data ?? 'key' AND id = ?"), 1);
        let (sql, args) = compiled(&Expr::raw("data ?? 'key'", []));
        assert_eq!(sql, "data ?? 'key'");
        assert!(args.is_empty());
    }

    #[test]
    fn function_argument_errors_name_the_function() {
        let expr = Expr::func("GREATEST", [Arg::Value(Value::Int(1)), Arg::Expr(Expr::raw("?", []))]);
        let err = expr.compile().unwrap_err();
        assert!(err.to_string().starts_with("error compiling argument 1 of GREATEST:"));
    }

    #[test]
    fn expressions_deserialize_from_json() {
        let expr: Expr = serde_json::from_str(
            r#"{"composite": {"combinator": "or", "children": [
                {"node": {"left": {"ident": "status"}, "right": {"value": {"type": "text", "value": "active"}}}},
                {"node": {"left": {"ident": "age"}, "right": {"expr": {"leaf": {"op": "gte", "value": {"type": "int", "value": 18}}}}}}
            ]}}"#,
        )
        .unwrap();
        let (sql, args) = compiled(&expr);
        assert_eq!(sql, "(status = ? OR age >= ?)");
        assert_eq!(args, vec![Value::from("active"), Value::Int(18)]);
    }
}
