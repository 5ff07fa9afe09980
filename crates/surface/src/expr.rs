use foundation::color::Rgba;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Comparison operators understood by the style engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CmpOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
        }
    }
}

/// Typed style expression.
///
/// This is the subset of the engine's expression language the dashboard
/// emits. It serializes to the engine's JSON array form and can also be
/// evaluated locally against a feature, which is how filters and ramps are
/// checked without a rendering engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Get(String),
    ToNumber(Box<Expr>),
    Coalesce(Vec<Expr>),
    GeometryType,
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    All(Vec<Expr>),
    /// Linear interpolation over `(stop, output)` pairs with increasing stops.
    Interpolate {
        input: Box<Expr>,
        stops: Vec<(f64, Expr)>,
    },
}

/// What an expression can see of a feature.
#[derive(Debug, Copy, Clone)]
pub struct FeatureRef<'a> {
    pub properties: &'a Map<String, Value>,
    pub geometry_type: &'a str,
}

impl<'a> FeatureRef<'a> {
    pub fn new(properties: &'a Map<String, Value>, geometry_type: &'a str) -> Self {
        Self {
            properties,
            geometry_type,
        }
    }
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn number(value: f64) -> Self {
        Expr::Literal(Value::from(value))
    }

    pub fn color(color: Rgba) -> Self {
        Expr::Literal(Value::String(color.to_css()))
    }

    pub fn get(property: impl Into<String>) -> Self {
        Expr::Get(property.into())
    }

    pub fn to_number(inner: Expr) -> Self {
        Expr::ToNumber(Box::new(inner))
    }

    pub fn coalesce(options: Vec<Expr>) -> Self {
        Expr::Coalesce(options)
    }

    pub fn cmp(op: CmpOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Compare(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn all(conditions: Vec<Expr>) -> Self {
        Expr::All(conditions)
    }

    pub fn interpolate_linear(input: Expr, stops: Vec<(f64, Expr)>) -> Self {
        Expr::Interpolate {
            input: Box::new(input),
            stops,
        }
    }

    /// `coalesce(to-number(get(column)), 0)`: a numeric column where absent,
    /// null and non-numeric values all read as zero.
    pub fn numeric_column(column: impl Into<String>) -> Self {
        Expr::coalesce(vec![
            Expr::to_number(Expr::get(column)),
            Expr::number(0.0),
        ])
    }

    /// The engine's JSON array form.
    pub fn to_json(&self) -> Value {
        match self {
            Expr::Literal(v @ (Value::Array(_) | Value::Object(_))) => {
                Value::Array(vec![Value::from("literal"), v.clone()])
            }
            Expr::Literal(v) => v.clone(),
            Expr::Get(name) => Value::Array(vec![Value::from("get"), Value::from(name.as_str())]),
            Expr::ToNumber(inner) => Value::Array(vec![Value::from("to-number"), inner.to_json()]),
            Expr::Coalesce(options) => op_array("coalesce", options),
            Expr::GeometryType => Value::Array(vec![Value::from("geometry-type")]),
            Expr::Compare(op, lhs, rhs) => {
                Value::Array(vec![Value::from(op.as_str()), lhs.to_json(), rhs.to_json()])
            }
            Expr::All(conditions) => op_array("all", conditions),
            Expr::Interpolate { input, stops } => {
                let mut out = Vec::with_capacity(3 + stops.len() * 2);
                out.push(Value::from("interpolate"));
                out.push(Value::Array(vec![Value::from("linear")]));
                out.push(input.to_json());
                for (stop, output) in stops {
                    out.push(Value::from(*stop));
                    out.push(output.to_json());
                }
                Value::Array(out)
            }
        }
    }

    pub fn evaluate(&self, feature: FeatureRef<'_>) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Get(name) => feature.properties.get(name).cloned().unwrap_or(Value::Null),
            Expr::ToNumber(inner) => to_number(&inner.evaluate(feature)),
            Expr::Coalesce(options) => options
                .iter()
                .map(|o| o.evaluate(feature))
                .find(|v| !v.is_null())
                .unwrap_or(Value::Null),
            Expr::GeometryType => Value::from(feature.geometry_type),
            Expr::Compare(op, lhs, rhs) => {
                Value::Bool(compare(*op, &lhs.evaluate(feature), &rhs.evaluate(feature)))
            }
            Expr::All(conditions) => Value::Bool(
                conditions
                    .iter()
                    .all(|c| c.evaluate(feature) == Value::Bool(true)),
            ),
            Expr::Interpolate { input, stops } => match input.evaluate(feature).as_f64() {
                Some(x) => interpolate(x, stops, feature),
                None => Value::Null,
            },
        }
    }

    /// Evaluates as a filter predicate.
    pub fn matches(&self, feature: FeatureRef<'_>) -> bool {
        self.evaluate(feature) == Value::Bool(true)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn op_array(op: &str, args: &[Expr]) -> Value {
    let mut out = Vec::with_capacity(args.len() + 1);
    out.push(Value::from(op));
    out.extend(args.iter().map(Expr::to_json));
    Value::Array(out)
}

// null/false read as 0 and true as 1; unparsable strings yield null so a
// surrounding coalesce can supply the fallback.
fn to_number(v: &Value) -> Value {
    match v {
        Value::Number(_) => v.clone(),
        Value::Null | Value::Bool(false) => Value::from(0.0),
        Value::Bool(true) => Value::from(1.0),
        Value::String(s) => s.trim().parse::<f64>().map(Value::from).unwrap_or(Value::Null),
        Value::Array(_) | Value::Object(_) => Value::Null,
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> bool {
    if let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) {
        return match op {
            CmpOp::Eq => a == b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
        };
    }
    match (op, lhs, rhs) {
        (CmpOp::Eq, Value::String(a), Value::String(b)) => a == b,
        (CmpOp::Eq, Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

fn interpolate(x: f64, stops: &[(f64, Expr)], feature: FeatureRef<'_>) -> Value {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Value::Null;
    };
    if x <= first.0 {
        return first.1.evaluate(feature);
    }
    if x >= last.0 {
        return last.1.evaluate(feature);
    }

    for pair in stops.windows(2) {
        let (lo, hi) = (&pair[0], &pair[1]);
        if x > hi.0 {
            continue;
        }
        let span = hi.0 - lo.0;
        let t = if span > 0.0 { (x - lo.0) / span } else { 0.0 };
        let a = lo.1.evaluate(feature);
        let b = hi.1.evaluate(feature);
        if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
            return Value::from(a + (b - a) * t);
        }
        let color_a = a.as_str().and_then(Rgba::parse);
        let color_b = b.as_str().and_then(Rgba::parse);
        if let (Some(ca), Some(cb)) = (color_a, color_b) {
            return Value::from(ca.lerp(cb, t).to_css());
        }
        return a;
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::{CmpOp, Expr, FeatureRef};
    use foundation::color::Rgba;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, Value, json};

    fn props(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn serializes_to_engine_array_form() {
        let e = Expr::all(vec![
            Expr::cmp(CmpOp::Gt, Expr::numeric_column("walk_15min"), Expr::number(0.0)),
            Expr::cmp(CmpOp::Eq, Expr::GeometryType, Expr::lit("Point")),
        ]);
        assert_eq!(
            serde_json::to_value(&e).unwrap(),
            json!([
                "all",
                [">", ["coalesce", ["to-number", ["get", "walk_15min"]], 0.0], 0.0],
                ["==", ["geometry-type"], "Point"]
            ])
        );
    }

    #[test]
    fn array_literals_are_wrapped() {
        assert_eq!(Expr::lit(json!([1, 2])).to_json(), json!(["literal", [1, 2]]));
    }

    #[test]
    fn numeric_column_treats_missing_and_junk_as_zero() {
        let e = Expr::numeric_column("x");
        let cases = [
            (json!({}), 0.0),
            (json!({"x": null}), 0.0),
            (json!({"x": "abc"}), 0.0),
            (json!({"x": "12.5"}), 12.5),
            (json!({"x": 7}), 7.0),
        ];
        for (p, want) in cases {
            let p = props(p);
            let got = e.evaluate(FeatureRef::new(&p, "Polygon")).as_f64();
            assert_eq!(got, Some(want));
        }
    }

    #[test]
    fn interpolate_numbers_and_colors() {
        let p = props(json!({"d": 500}));
        let f = FeatureRef::new(&p, "Polygon");

        let height = Expr::interpolate_linear(
            Expr::get("d"),
            vec![(0.0, Expr::number(0.0)), (1000.0, Expr::number(500.0))],
        );
        assert_eq!(height.evaluate(f).as_f64(), Some(250.0));

        let color = Expr::interpolate_linear(
            Expr::get("d"),
            vec![
                (0.0, Expr::color(Rgba::rgb(0, 0, 0))),
                (1000.0, Expr::color(Rgba::rgb(200, 100, 50))),
            ],
        );
        assert_eq!(color.evaluate(f), Value::from("#643219"));
    }

    #[test]
    fn interpolate_clamps_outside_stops() {
        let p = props(json!({"d": -5}));
        let e = Expr::interpolate_linear(
            Expr::get("d"),
            vec![(0.0, Expr::number(1.0)), (10.0, Expr::number(2.0))],
        );
        assert_eq!(e.evaluate(FeatureRef::new(&p, "Point")).as_f64(), Some(1.0));
    }

    #[test]
    fn geometry_type_filter() {
        let p = Map::new();
        let e = Expr::cmp(CmpOp::Eq, Expr::GeometryType, Expr::lit("Point"));
        assert!(e.matches(FeatureRef::new(&p, "Point")));
        assert!(!e.matches(FeatureRef::new(&p, "Polygon")));
    }
}
