use crate::compute::bytecode::{MathExpr, OpCode};
use crate::compute::linker::{Layout, VarRef};
use crate::store::{ExprClass, ExprKind, Registry};
use std::collections::HashMap;
use std::fmt::Write;

// Binding strength of each rendered fragment, loosest first.
const ADDITIVE: u8 = 1;
const MULTIPLICATIVE: u8 = 2;
const UNARY: u8 = 3;
const POWER: u8 = 4;
const ATOM: u8 = 5;

/// Renders a compiled tape back to infix text, adding only the parentheses
/// needed for it to compile to the same tape again.
pub fn format_expr(expr: &MathExpr, namer: impl Fn(u32) -> String) -> String {
    let mut stack: Vec<(String, u8)> = Vec::with_capacity(expr.max_depth());

    for (&op, &arg) in expr.ops.iter().zip(&expr.args) {
        match op {
            OpCode::Num => {
                let v = expr.values.get(arg as usize).copied().unwrap_or(0.0);
                stack.push((format!("{}", v), ATOM));
            }
            OpCode::Var => stack.push((namer(arg), ATOM)),
            OpCode::Neg => {
                let (x, p) = stack.pop().unwrap_or_default();
                stack.push((format!("-{}", wrap(x, p <= UNARY)), UNARY));
            }
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => {
                let (r, rp) = stack.pop().unwrap_or_default();
                let (l, lp) = stack.pop().unwrap_or_default();
                let (sym, prec) = match op {
                    OpCode::Add => ("+", ADDITIVE),
                    OpCode::Sub => ("-", ADDITIVE),
                    OpCode::Mul => ("*", MULTIPLICATIVE),
                    OpCode::Div => ("/", MULTIPLICATIVE),
                    _ => ("^", POWER),
                };
                let text = if op == OpCode::Pow {
                    format!("{}^{}", wrap(l, lp <= POWER), wrap(r, rp < POWER))
                } else {
                    // Left-associative: an equal-strength right operand needs parentheses.
                    format!("{} {} {}", wrap(l, lp < prec), sym, wrap(r, rp <= prec))
                };
                stack.push((text, prec));
            }
            f => {
                let (x, _) = stack.pop().unwrap_or_default();
                stack.push((format!("{}({})", f.name(), x), ATOM));
            }
        }
    }
    stack.pop().map(|(s, _)| s).unwrap_or_default()
}

fn wrap(text: String, parens: bool) -> String {
    if parens { format!("({})", text) } else { text }
}

/// Name of the object a variable code refers to under `layout`.
pub fn variable_name(registry: &Registry, layout: Layout, code: u32) -> String {
    let id = match layout.decode(code) {
        Some(VarRef::Species(i)) => registry.species_at(i).map(|s| s.id.clone()),
        Some(VarRef::Term(i)) => registry.term(i).map(|t| t.id.clone()),
        Some(VarRef::Parameter(i)) => registry.param(i).map(|p| p.id.clone()),
        Some(VarRef::Constant(i)) => registry.constant(i).map(|c| c.id.clone()),
        Some(VarRef::Hydraulic(h)) => return h.name().to_string(),
        None => None,
    };
    id.map(|s| s.to_string()).unwrap_or_else(|| format!("?{}", code))
}

/// Equation text of an expression compiled against the registry's layout.
pub fn expression_text(registry: &Registry, expr: &MathExpr) -> String {
    let layout = registry.layout();
    format_expr(expr, |code| variable_name(registry, layout, code))
}

/// Dependency tree of one term (1-based).
pub fn format_term_trace(registry: &Registry, term: usize) -> String {
    let mut tracer = Tracer::new(registry);
    match registry.term(term) {
        Some(t) => {
            let _ = writeln!(tracer.output, "AUDIT TRACE for term '{}':", t.id);
            let _ = writeln!(tracer.output, "--------------------------------------------------");
            let code = tracer.layout.encode(VarRef::Term(term));
            tracer.trace_code(code, 1, "");
        }
        None => {
            let _ = writeln!(tracer.output, "Error: Invalid term index {}", term);
        }
    }
    tracer.output
}

/// Dependency tree of a species' pipe or tank expression.
pub fn format_species_trace(registry: &Registry, species: usize, class: ExprClass) -> String {
    let mut tracer = Tracer::new(registry);
    let (Some(s), Some(expr)) = (registry.species_at(species), registry.expression(species, class)) else {
        let _ = writeln!(tracer.output, "Error: No {:?} expression for species {}", class, species);
        return tracer.output;
    };
    let _ = writeln!(tracer.output, "AUDIT TRACE for {:?} expression of '{}':", class, s.id);
    let _ = writeln!(tracer.output, "--------------------------------------------------");
    let lhs = match s.binding(class).kind() {
        ExprKind::Rate => format!("d{}/dt", s.id),
        ExprKind::Equil => "0".to_string(),
        ExprKind::Formula | ExprKind::None => s.id.to_string(),
    };
    let _ = writeln!(tracer.output, "[L1] {} = {}", lhs, expression_text(registry, expr));
    tracer.recurse_children("", expr, 1);
    tracer.output
}

struct Tracer<'a> {
    registry: &'a Registry,
    layout: Layout,
    visited_at_level: HashMap<u32, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn new(registry: &'a Registry) -> Self {
        Self { registry, layout: registry.layout(), visited_at_level: HashMap::new(), output: String::new() }
    }

    fn trace_code(&mut self, code: u32, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&code) {
            let _ = writeln!(self.output, "{}-> (Ref to L{})", prefix, first_seen);
            return;
        }
        self.visited_at_level.insert(code, level);

        let name = variable_name(self.registry, self.layout, code);
        let header = format!("[L{}] {}", level, name);
        match self.layout.decode(code) {
            Some(VarRef::Term(t)) => {
                let Some(term) = self.registry.term(t) else { return };
                let text = expression_text(self.registry, &term.expr);
                let _ = writeln!(self.output, "{}{} = {}", prefix, header, text);
                self.recurse_children(prefix, &term.expr, level);
            }
            Some(VarRef::Species(_)) => {
                let _ = writeln!(self.output, "{}{} -> Species", prefix, header);
            }
            Some(VarRef::Parameter(p)) => {
                let v = self.registry.param(p).map(|c| c.value).unwrap_or(0.0);
                let _ = writeln!(self.output, "{}{} -> Parameter [{:.3}]", prefix, header, v);
            }
            Some(VarRef::Constant(c)) => {
                let v = self.registry.constant(c).map(|c| c.value).unwrap_or(0.0);
                let _ = writeln!(self.output, "{}{} -> Constant [{:.3}]", prefix, header, v);
            }
            Some(VarRef::Hydraulic(_)) => {
                let _ = writeln!(self.output, "{}{} -> Hydraulic", prefix, header);
            }
            None => {
                let _ = writeln!(self.output, "{}{} -> (dangling)", prefix, header);
            }
        }
    }

    fn recurse_children(&mut self, prefix: &str, expr: &MathExpr, level: usize) {
        let mut children: Vec<u32> = Vec::new();
        for code in expr.variables() {
            if !children.contains(&code) {
                children.push(code);
            }
        }
        let stem = build_child_stem(prefix);
        for (i, &child) in children.iter().enumerate() {
            let connector = if i == children.len() - 1 { "`--" } else { "|--" };
            self.trace_code(child, level + 1, &format!("{}{}", stem, connector));
        }
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::bytecode::compile;
    use rstest::rstest;

    fn names(code: u32) -> String {
        ["?", "a", "b", "c"].get(code as usize).unwrap_or(&"?").to_string()
    }

    fn resolve(name: &str) -> Option<u32> {
        ["a", "b", "c"].iter().position(|n| *n == name).map(|i| i as u32 + 1)
    }

    #[rstest]
    #[case("a + b * c", "a + b * c")]
    #[case("(a + b) * c", "(a + b) * c")]
    #[case("a - (b - c)", "a - (b - c)")]
    #[case("a - b - c", "a - b - c")]
    #[case("a / (b * c)", "a / (b * c)")]
    #[case("a ^ b ^ c", "a^b^c")]
    #[case("(a ^ b) ^ c", "(a^b)^c")]
    #[case("-a ^ 2", "-a^2")]
    #[case("(-a) ^ 2", "(-a)^2")]
    #[case("exp(-a * 0.5)", "EXP(-a * 0.5)")]
    #[case("-(a + b)", "-(a + b)")]
    fn test_format_expr(#[case] input: &str, #[case] expected: &str) {
        let expr = compile(input, &resolve).unwrap();
        let text = format_expr(&expr, names);
        assert_eq!(text, expected);
        // Rendering compiles back to the same tape.
        assert_eq!(compile(&text, &resolve).unwrap(), expr);
    }
}
