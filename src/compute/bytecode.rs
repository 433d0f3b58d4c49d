use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{0}' at {1}")]
    UnexpectedChar(char, usize),
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // Operands
    Num,
    Var,
    // Unary
    Neg,
    // Binary
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    // Functions
    Cos,
    Sin,
    Tan,
    Cot,
    Abs,
    Sgn,
    Sqrt,
    Log,
    Exp,
    Asin,
    Acos,
    Atan,
    Acot,
    Sinh,
    Cosh,
    Tanh,
    Coth,
    Log10,
    Step,
}

impl OpCode {
    const FUNCTIONS: [(&'static str, OpCode); 19] = [
        ("COS", OpCode::Cos),
        ("SIN", OpCode::Sin),
        ("TAN", OpCode::Tan),
        ("COT", OpCode::Cot),
        ("ABS", OpCode::Abs),
        ("SGN", OpCode::Sgn),
        ("SQRT", OpCode::Sqrt),
        ("LOG", OpCode::Log),
        ("EXP", OpCode::Exp),
        ("ASIN", OpCode::Asin),
        ("ACOS", OpCode::Acos),
        ("ATAN", OpCode::Atan),
        ("ACOT", OpCode::Acot),
        ("SINH", OpCode::Sinh),
        ("COSH", OpCode::Cosh),
        ("TANH", OpCode::Tanh),
        ("COTH", OpCode::Coth),
        ("LOG10", OpCode::Log10),
        ("STEP", OpCode::Step),
    ];

    /// Case-insensitive function lookup.
    pub fn function(name: &str) -> Option<OpCode> {
        Self::FUNCTIONS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, op)| op)
    }

    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Num => "Num",
            OpCode::Var => "Var",
            OpCode::Neg => "Neg",
            OpCode::Add => "Add",
            OpCode::Sub => "Subtract",
            OpCode::Mul => "Multiply",
            OpCode::Div => "Divide",
            OpCode::Pow => "Power",
            f => Self::FUNCTIONS
                .iter()
                .find(|(_, op)| op == f)
                .map(|(n, _)| *n)
                .unwrap_or("?"),
        }
    }

    #[inline(always)]
    pub fn arity(&self) -> usize {
        match self {
            OpCode::Num | OpCode::Var => 0,
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => 2,
            _ => 1,
        }
    }
}

/// A compiled expression as a postfix tape in Structure-of-Arrays layout.
///
/// `args[i]` is the variable code for `Var`, an index into `values` for `Num`,
/// and 0 for everything else. Variable codes are positional (see
/// `linker::Layout`) and get patched in place when the layout grows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MathExpr {
    pub ops: Vec<OpCode>,
    pub args: Vec<u32>,
    pub values: Vec<f64>,
}

impl MathExpr {
    pub fn len(&self) -> usize { self.ops.len() }
    pub fn is_empty(&self) -> bool { self.ops.is_empty() }

    /// Variable codes read by this expression, in tape order.
    pub fn variables(&self) -> impl Iterator<Item = u32> + '_ {
        self.ops
            .iter()
            .zip(&self.args)
            .filter(|(op, _)| **op == OpCode::Var)
            .map(|(_, &code)| code)
    }

    pub(crate) fn variables_mut(&mut self) -> impl Iterator<Item = &mut u32> + '_ {
        self.ops
            .iter()
            .zip(self.args.iter_mut())
            .filter(|(op, _)| **op == OpCode::Var)
            .map(|(_, code)| code)
    }

    /// Deepest operand stack reached while evaluating.
    pub fn max_depth(&self) -> usize {
        let mut depth = 0usize;
        let mut max = 0usize;
        for op in &self.ops {
            match op.arity() {
                0 => depth += 1,
                2 => depth = depth.saturating_sub(1),
                _ => {}
            }
            max = max.max(depth);
        }
        max
    }

    fn emit(&mut self, op: OpCode, arg: u32) {
        self.ops.push(op);
        self.args.push(arg);
    }

    fn emit_num(&mut self, v: f64) {
        let slot = self.values.len() as u32;
        self.values.push(v);
        self.emit(OpCode::Num, slot);
    }
}

/// Maps an identifier to its variable code.
pub trait VariableResolver {
    fn resolve(&self, name: &str) -> Option<u32>;
}

impl<F: Fn(&str) -> Option<u32>> VariableResolver for F {
    fn resolve(&self, name: &str) -> Option<u32> {
        self(name)
    }
}

// --- Lexer ---

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Num(f64),
    Ident(&'a str),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl Token<'_> {
    fn text(&self) -> String {
        match self {
            Token::Num(v) => v.to_string(),
            Token::Ident(s) => s.to_string(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Caret => "^".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>, CompileError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'+' => { tokens.push(Token::Plus); i += 1; }
            b'-' => { tokens.push(Token::Minus); i += 1; }
            b'*' => { tokens.push(Token::Star); i += 1; }
            b'/' => { tokens.push(Token::Slash); i += 1; }
            b'^' => { tokens.push(Token::Caret); i += 1; }
            b'(' => { tokens.push(Token::LParen); i += 1; }
            b')' => { tokens.push(Token::RParen); i += 1; }
            b'0'..=b'9' | b'.' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') { i += 1; }
                // Exponent part, only when digits follow.
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') { j += 1; }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        while j < bytes.len() && bytes[j].is_ascii_digit() { j += 1; }
                        i = j;
                    }
                }
                let lexeme = &text[start..i];
                let v = lexeme
                    .parse::<f64>()
                    .map_err(|_| CompileError::UnexpectedToken(lexeme.to_string()))?;
                tokens.push(Token::Num(v));
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') { i += 1; }
                tokens.push(Token::Ident(&text[start..i]));
            }
            _ => {
                let ch = text[i..].chars().next().unwrap_or('?');
                return Err(CompileError::UnexpectedChar(ch, i));
            }
        }
    }
    Ok(tokens)
}

// --- Parser ---

/// Recursive-descent compiler that emits postfix code directly.
///
/// Precedence, loosest first: `+ -`, `* /`, unary sign, `^` (right
/// associative), then literals, variables, calls and parentheses.
pub struct Compiler<'a, R: VariableResolver + ?Sized> {
    resolver: &'a R,
}

struct Parser<'t, 'r, R: VariableResolver + ?Sized> {
    tokens: Vec<Token<'t>>,
    pos: usize,
    resolver: &'r R,
    out: MathExpr,
}

impl<'a, R: VariableResolver + ?Sized> Compiler<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self { resolver }
    }

    pub fn compile(&self, text: &str) -> Result<MathExpr, CompileError> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(CompileError::Empty);
        }
        let mut parser = Parser { tokens, pos: 0, resolver: self.resolver, out: MathExpr::default() };
        parser.parse_additive()?;
        if let Some(tok) = parser.peek() {
            return Err(CompileError::UnexpectedToken(tok.text()));
        }
        Ok(parser.out)
    }
}

/// Compiles `text` against `resolver`.
pub fn compile<R: VariableResolver + ?Sized>(text: &str, resolver: &R) -> Result<MathExpr, CompileError> {
    Compiler::new(resolver).compile(text)
}

impl<'t, 'r, R: VariableResolver + ?Sized> Parser<'t, 'r, R> {
    fn peek(&self) -> Option<&Token<'t>> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token<'t>> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Token<'static>) -> Result<(), CompileError> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(CompileError::UnexpectedToken(tok.text())),
            None => Err(CompileError::UnexpectedEnd),
        }
    }

    fn parse_additive(&mut self) -> Result<(), CompileError> {
        self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => OpCode::Add,
                Some(Token::Minus) => OpCode::Sub,
                _ => break,
            };
            self.advance();
            self.parse_multiplicative()?;
            self.out.emit(op, 0);
        }
        Ok(())
    }

    fn parse_multiplicative(&mut self) -> Result<(), CompileError> {
        self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => OpCode::Mul,
                Some(Token::Slash) => OpCode::Div,
                _ => break,
            };
            self.advance();
            let start = self.out.ops.len();
            self.parse_unary()?;
            if op == OpCode::Div && self.is_literal_zero(start) {
                return Err(CompileError::DivisionByZero);
            }
            self.out.emit(op, 0);
        }
        Ok(())
    }

    /// True when the ops from `start` are a zero literal under any number of
    /// unary minuses.
    fn is_literal_zero(&self, start: usize) -> bool {
        match self.out.ops.get(start..) {
            Some([OpCode::Num, signs @ ..]) => {
                signs.iter().all(|&op| op == OpCode::Neg) && self.out.values[self.out.args[start] as usize] == 0.0
            }
            _ => false,
        }
    }

    fn parse_unary(&mut self) -> Result<(), CompileError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                self.parse_unary()?;
                self.out.emit(OpCode::Neg, 0);
                Ok(())
            }
            Some(Token::Plus) => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<(), CompileError> {
        self.parse_primary()?;
        if self.peek() == Some(&Token::Caret) {
            self.advance();
            // Right-associative: the exponent may itself be a power or signed.
            self.parse_unary()?;
            self.out.emit(OpCode::Pow, 0);
        }
        Ok(())
    }

    fn parse_primary(&mut self) -> Result<(), CompileError> {
        match self.advance() {
            Some(Token::Num(v)) => {
                self.out.emit_num(v);
                Ok(())
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    let op = OpCode::function(name)
                        .ok_or_else(|| CompileError::UnknownFunction(name.to_string()))?;
                    self.advance();
                    self.parse_additive()?;
                    self.expect(Token::RParen)?;
                    self.out.emit(op, 0);
                } else {
                    let code = self
                        .resolver
                        .resolve(name)
                        .ok_or_else(|| CompileError::UndefinedVariable(name.to_string()))?;
                    self.out.emit(OpCode::Var, code);
                }
                Ok(())
            }
            Some(Token::LParen) => {
                self.parse_additive()?;
                self.expect(Token::RParen)
            }
            Some(tok) => Err(CompileError::UnexpectedToken(tok.text())),
            None => Err(CompileError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn resolver(name: &str) -> Option<u32> {
        match name {
            "A" => Some(1),
            "B" => Some(2),
            "C" => Some(3),
            _ => None,
        }
    }

    fn ops(text: &str) -> Vec<OpCode> {
        compile(text, &resolver).unwrap().ops
    }

    #[test]
    fn test_precedence_emits_postfix() {
        use OpCode::*;
        assert_eq!(ops("A + B * C"), vec![Var, Var, Var, Mul, Add]);
        assert_eq!(ops("(A + B) * C"), vec![Var, Var, Add, Var, Mul]);
        assert_eq!(ops("A - B - C"), vec![Var, Var, Sub, Var, Sub]);
    }

    #[test]
    fn test_power_is_right_associative() {
        use OpCode::*;
        assert_eq!(ops("A ^ B ^ C"), vec![Var, Var, Var, Pow, Pow]);
        assert_eq!(ops("-A ^ 2"), vec![Var, Num, Pow, Neg]);
        assert_eq!(ops("A ^ -B"), vec![Var, Var, Neg, Pow]);
    }

    #[test]
    fn test_functions_are_case_insensitive() {
        assert_eq!(ops("exp(A)"), vec![OpCode::Var, OpCode::Exp]);
        assert_eq!(ops("Log10(A)").last(), Some(&OpCode::Log10));
        assert_eq!(ops("step(A - 1)").last(), Some(&OpCode::Step));
    }

    #[test]
    fn test_numeric_literals() {
        let e = compile("1.5e-3 * A + .5 + 2E2", &resolver).unwrap();
        assert_eq!(e.values, vec![1.5e-3, 0.5, 200.0]);
    }

    #[test]
    fn test_variables_listed_in_order() {
        let e = compile("C * A + C", &resolver).unwrap();
        assert_eq!(e.variables().collect::<Vec<_>>(), vec![3, 1, 3]);
        assert_eq!(e.max_depth(), 2);
    }

    #[rstest]
    #[case("", CompileError::Empty)]
    #[case("A +", CompileError::UnexpectedEnd)]
    #[case("A B", CompileError::UnexpectedToken("B".into()))]
    #[case("(A + B", CompileError::UnexpectedEnd)]
    #[case("A / 0", CompileError::DivisionByZero)]
    #[case("A / 0.0e0", CompileError::DivisionByZero)]
    #[case("A / (0)", CompileError::DivisionByZero)]
    #[case("A / -0", CompileError::DivisionByZero)]
    #[case("A / -(-0)", CompileError::DivisionByZero)]
    #[case("D + 1", CompileError::UndefinedVariable("D".into()))]
    #[case("foo(A)", CompileError::UnknownFunction("foo".into()))]
    #[case("A $ B", CompileError::UnexpectedChar('$', 2))]
    fn test_compile_errors(#[case] text: &str, #[case] expected: CompileError) {
        assert_eq!(compile(text, &resolver).unwrap_err(), expected);
    }

    #[test]
    fn test_division_by_expression_allowed() {
        assert!(compile("A / (B - B)", &resolver).is_ok());
        assert!(compile("A / 0.5", &resolver).is_ok());
        assert!(compile("A / -B", &resolver).is_ok());
        assert!(compile("A / -0 ^ B", &resolver).is_ok());
    }
}
