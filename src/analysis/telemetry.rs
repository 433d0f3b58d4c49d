use crate::compute::bytecode::MathExpr;
use crate::store::{ExprBinding, ObjectType, Registry};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct TelemetryReport {
    /// Live objects per type, indexed by `ObjectType::index`.
    pub object_counts: [usize; ObjectType::COUNT],
    pub op_counts: HashMap<String, usize>,
    pub total_ops: usize,
    /// Owned compiled tapes (terms plus species expressions).
    pub expressions: usize,
    /// Tank expressions bound to their species' pipe expression.
    pub aliases: usize,
    /// Deepest evaluation stack across all tapes.
    pub max_stack_depth: usize,
}

impl TelemetryReport {
    pub fn analyze(registry: &Registry) -> Self {
        let mut report = Self::default();
        for ty in ObjectType::ALL {
            report.object_counts[ty.index()] = registry.count(ty);
        }

        for expr in registry.owned_expressions() {
            report.record(expr);
        }
        report.aliases = registry
            .species
            .iter()
            .filter(|s| matches!(s.tank, ExprBinding::Alias { .. }))
            .count();
        report
    }

    fn record(&mut self, expr: &MathExpr) {
        self.expressions += 1;
        self.total_ops += expr.len();
        self.max_stack_depth = self.max_stack_depth.max(expr.max_depth());
        for op in &expr.ops {
            *self.op_counts.entry(op.name().to_string()).or_insert(0) += 1;
        }
    }

    pub fn count(&self, ty: ObjectType) -> usize {
        self.object_counts[ty.index()]
    }
}
