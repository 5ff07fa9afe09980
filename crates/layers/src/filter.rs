use serde_json::{Map, Value};
use surface::{CmpOp, Expr, FeatureRef};
use view::{TransportMode, ViewState};

/// Name of the polygon column holding minutes to the closest clinic.
pub fn coverage_column(mode: TransportMode, range_minutes: u32) -> String {
    format!("{}_{range_minutes}min", mode.as_str())
}

/// `0 < value(column) <= threshold`, with missing or non-numeric values
/// reading as 0 and therefore rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpression {
    pub column: String,
    pub threshold: u32,
}

impl FilterExpression {
    pub fn new(mode: TransportMode, range_minutes: u32) -> Self {
        Self {
            column: coverage_column(mode, range_minutes),
            threshold: range_minutes,
        }
    }

    pub fn for_view(state: &ViewState) -> Self {
        Self::new(state.mode, state.range_minutes)
    }

    /// The numeric column value the filter and the color ramp read.
    pub fn value_expr(&self) -> Expr {
        Expr::numeric_column(self.column.as_str())
    }

    pub fn to_expr(&self) -> Expr {
        Expr::all(vec![
            Expr::cmp(CmpOp::Gt, self.value_expr(), Expr::number(0.0)),
            Expr::cmp(
                CmpOp::Le,
                self.value_expr(),
                Expr::number(f64::from(self.threshold)),
            ),
        ])
    }

    pub fn accepts(&self, properties: &Map<String, Value>) -> bool {
        self.to_expr()
            .matches(FeatureRef::new(properties, "Polygon"))
    }
}
