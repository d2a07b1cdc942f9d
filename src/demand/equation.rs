//! 동시사용 유량 수식(`a*D+b*sqrt(D)`, `a*(sum(Q,q))^b-c`).
//! 파싱은 카탈로그 로드 시 한 번만 하고, 평가는 후위 표기 스택으로 재귀 없이 수행한다.

use std::collections::BTreeMap;

/// 수식 파싱/평가 오류.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("수식 '{expr}' 위치 {position} 구문 오류: {message}")]
    Syntax {
        expr: String,
        position: usize,
        message: String,
    },
    #[error("수식 '{expr}'에 누적값 외 변수가 둘 이상 있습니다: {names:?}")]
    UnknownVariables { expr: String, names: Vec<String> },
    #[error("수식 '{expr}' 계산 결과가 유한하지 않습니다 (입력 {input})")]
    NonFinite { expr: String, input: f64 },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    /// `sum(...)`: 누적 합계 자체
    Accumulated,
    Op(char),
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Const(f64),
    Input,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Neg,
    Sqrt,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StackItem {
    Binary(char),
    Neg,
    Sqrt,
    LParen,
}

impl StackItem {
    fn precedence(&self) -> u8 {
        match self {
            StackItem::Binary('+') | StackItem::Binary('-') => 1,
            StackItem::Binary('^') => 4,
            StackItem::Binary(_) => 2,
            StackItem::Neg => 3,
            StackItem::Sqrt | StackItem::LParen => 0,
        }
    }

    fn step(&self) -> Option<Step> {
        match self {
            StackItem::Binary('+') => Some(Step::Add),
            StackItem::Binary('-') => Some(Step::Sub),
            StackItem::Binary('*') => Some(Step::Mul),
            StackItem::Binary('/') => Some(Step::Div),
            StackItem::Binary('^') => Some(Step::Pow),
            StackItem::Binary(_) => None,
            StackItem::Neg => Some(Step::Neg),
            StackItem::Sqrt => Some(Step::Sqrt),
            StackItem::LParen => None,
        }
    }
}

/// 누적값 하나를 입력으로 받는 닫힌 형태 수식.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    steps: Vec<Step>,
}

impl Formula {
    /// 수식을 파싱한다. `constants`에 없는 이름과 `sum(...)`은 모두 누적값으로 묶인다.
    pub fn parse(expr: &str, constants: &BTreeMap<String, f64>) -> Result<Self, FormulaError> {
        let tokens = tokenize(expr)?;
        let syntax = |position: usize, message: &str| FormulaError::Syntax {
            expr: expr.to_string(),
            position,
            message: message.to_string(),
        };

        let mut free_names: Vec<String> = Vec::new();
        let mut steps = Vec::with_capacity(tokens.len());
        let mut stack: Vec<StackItem> = Vec::new();
        // 직전 토큰이 피연산자(또는 닫는 괄호)인지
        let mut after_operand = false;

        let mut iter = tokens.into_iter().peekable();
        while let Some((offset, token)) = iter.next() {
            match token {
                Token::Number(v) => {
                    if after_operand {
                        return Err(syntax(offset, "연산자가 필요합니다"));
                    }
                    steps.push(Step::Const(v));
                    after_operand = true;
                }
                Token::Accumulated => {
                    if after_operand {
                        return Err(syntax(offset, "연산자가 필요합니다"));
                    }
                    steps.push(Step::Input);
                    after_operand = true;
                }
                Token::Ident(name) => {
                    if after_operand {
                        return Err(syntax(offset, "연산자가 필요합니다"));
                    }
                    let is_call = matches!(iter.peek(), Some((_, Token::LParen)));
                    if name == "sqrt" && is_call {
                        stack.push(StackItem::Sqrt);
                        continue;
                    }
                    if is_call {
                        return Err(syntax(offset, "지원하지 않는 함수입니다"));
                    }
                    if let Some(v) = constants.get(&name) {
                        steps.push(Step::Const(*v));
                    } else {
                        if !free_names.contains(&name) {
                            free_names.push(name);
                        }
                        steps.push(Step::Input);
                    }
                    after_operand = true;
                }
                Token::LParen => {
                    if after_operand {
                        return Err(syntax(offset, "연산자가 필요합니다"));
                    }
                    stack.push(StackItem::LParen);
                }
                Token::RParen => {
                    if !after_operand {
                        return Err(syntax(offset, "피연산자가 필요합니다"));
                    }
                    loop {
                        match stack.pop() {
                            Some(StackItem::LParen) => break,
                            Some(item) => steps.extend(item.step()),
                            None => return Err(syntax(offset, "여는 괄호가 없습니다")),
                        }
                    }
                    if stack.last() == Some(&StackItem::Sqrt) {
                        stack.pop();
                        steps.push(Step::Sqrt);
                    }
                }
                Token::Op(op) => {
                    if !after_operand {
                        match op {
                            '-' => stack.push(StackItem::Neg),
                            '+' => {}
                            _ => return Err(syntax(offset, "피연산자가 필요합니다")),
                        }
                        continue;
                    }
                    let incoming = StackItem::Binary(op);
                    let right_assoc = op == '^';
                    while let Some(top) = stack.last().copied() {
                        let p_top = top.precedence();
                        let p_in = incoming.precedence();
                        let pops = matches!(top, StackItem::Binary(_) | StackItem::Neg)
                            && (p_top > p_in || (p_top == p_in && !right_assoc));
                        if !pops {
                            break;
                        }
                        stack.pop();
                        steps.extend(top.step());
                    }
                    stack.push(incoming);
                    after_operand = false;
                }
            }
        }
        if !after_operand {
            return Err(syntax(expr.len(), "수식이 연산자로 끝납니다"));
        }
        while let Some(item) = stack.pop() {
            match item {
                StackItem::LParen | StackItem::Sqrt => {
                    return Err(syntax(expr.len(), "닫는 괄호가 없습니다"))
                }
                other => steps.extend(other.step()),
            }
        }
        if free_names.len() > 1 {
            return Err(FormulaError::UnknownVariables {
                expr: expr.to_string(),
                names: free_names,
            });
        }
        check_arity(&steps).map_err(|m| syntax(0, m))?;

        Ok(Self {
            source: expr.to_string(),
            steps,
        })
    }

    /// 누적값을 대입해 계산한다.
    pub fn evaluate(&self, input: f64) -> Result<f64, FormulaError> {
        let mut stack: Vec<f64> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            match step {
                Step::Const(v) => stack.push(*v),
                Step::Input => stack.push(input),
                Step::Neg => {
                    if let Some(v) = stack.last_mut() {
                        *v = -*v;
                    }
                }
                Step::Sqrt => {
                    if let Some(v) = stack.last_mut() {
                        *v = v.sqrt();
                    }
                }
                binary => {
                    let (Some(rhs), Some(lhs)) = (stack.pop(), stack.pop()) else {
                        break;
                    };
                    stack.push(match binary {
                        Step::Add => lhs + rhs,
                        Step::Sub => lhs - rhs,
                        Step::Mul => lhs * rhs,
                        Step::Div => lhs / rhs,
                        _ => lhs.powf(rhs),
                    });
                }
            }
        }
        match stack.pop() {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(FormulaError::NonFinite {
                expr: self.source.clone(),
                input,
            }),
        }
    }
}

fn check_arity(steps: &[Step]) -> Result<(), &'static str> {
    let mut depth = 0usize;
    for step in steps {
        match step {
            Step::Const(_) | Step::Input => depth += 1,
            Step::Neg | Step::Sqrt => {
                if depth == 0 {
                    return Err("피연산자가 부족합니다");
                }
            }
            _ => {
                if depth < 2 {
                    return Err("피연산자가 부족합니다");
                }
                depth -= 1;
            }
        }
    }
    if depth == 1 {
        Ok(())
    } else {
        Err("빈 수식이거나 피연산자가 남습니다")
    }
}

fn tokenize(expr: &str) -> Result<Vec<(usize, Token)>, FormulaError> {
    let err = |position: usize, message: &str| FormulaError::Syntax {
        expr: expr.to_string(),
        position,
        message: message.to_string(),
    };
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // 지수부: 1e-3, 2.5E+2
            if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                let mut j = i + 1;
                if j < chars.len() && matches!(chars[j], '+' | '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    while j < chars.len() && chars[j].is_ascii_digit() {
                        j += 1;
                    }
                    i = j;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let v = text
                .parse::<f64>()
                .map_err(|_| err(start, "숫자 형식 오류"))?;
            tokens.push((start, Token::Number(v)));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            if name == "sum" {
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                if i >= chars.len() || chars[i] != '(' {
                    return Err(err(i, "sum 다음에는 괄호가 필요합니다"));
                }
                let mut depth = 0usize;
                loop {
                    match chars.get(i) {
                        Some('(') => depth += 1,
                        Some(')') => {
                            depth -= 1;
                            if depth == 0 {
                                i += 1;
                                break;
                            }
                        }
                        Some(_) => {}
                        None => return Err(err(start, "sum 괄호가 닫히지 않았습니다")),
                    }
                    i += 1;
                }
                tokens.push((start, Token::Accumulated));
            } else {
                tokens.push((start, Token::Ident(name)));
            }
        } else {
            let token = match c {
                '+' | '-' | '*' | '/' | '^' => Token::Op(c),
                '(' => Token::LParen,
                ')' => Token::RParen,
                _ => return Err(err(i, "알 수 없는 문자")),
            };
            tokens.push((i, token));
            i += 1;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consts(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn dwelling_equation() {
        let f = Formula::parse("a*D+b*sqrt(D)", &consts(&[("a", 0.03), ("b", 0.4554)])).unwrap();
        let v = f.evaluate(4.0).unwrap();
        assert!((v - (0.12 + 0.9108)).abs() < 1e-12);
    }

    #[test]
    fn din_equation_with_sum() {
        let f = Formula::parse(
            "a*(sum(Q,q))^b-c",
            &consts(&[("a", 1.48), ("b", 0.19), ("c", 0.94)]),
        )
        .unwrap();
        let v = f.evaluate(2.0).unwrap();
        assert!((v - (1.48 * 2f64.powf(0.19) - 0.94)).abs() < 1e-12);
    }

    #[test]
    fn precedence_and_unary_minus() {
        let f = Formula::parse("-x^2 + 2*3", &BTreeMap::new()).unwrap();
        assert_eq!(f.evaluate(3.0).unwrap(), -3.0);
        let g = Formula::parse("2^3^2", &BTreeMap::new()).unwrap();
        assert_eq!(g.evaluate(0.0).unwrap(), 512.0);
        let h = Formula::parse("(1 + 2) * -x", &BTreeMap::new()).unwrap();
        assert_eq!(h.evaluate(2.0).unwrap(), -6.0);
    }

    #[test]
    fn rejects_malformed() {
        let empty = BTreeMap::new();
        assert!(Formula::parse("a*(b", &empty).is_err());
        assert!(Formula::parse("a +", &empty).is_err());
        assert!(Formula::parse("log(x)", &empty).is_err());
        assert!(matches!(
            Formula::parse("x + y", &empty),
            Err(FormulaError::UnknownVariables { .. })
        ));
    }

    #[test]
    fn numbers_accept_exponent() {
        let f = Formula::parse("1e-3*D + 2.5E+2", &BTreeMap::new()).unwrap();
        assert!((f.evaluate(1000.0).unwrap() - 251.0).abs() < 1e-9);
        let g = Formula::parse("a*D^2E0", &consts(&[("a", 3e1)])).unwrap();
        assert_eq!(g.evaluate(2.0).unwrap(), 120.0);
        // 지수 숫자가 없으면 e는 변수 이름으로 남는다
        assert!(matches!(
            Formula::parse("2e + D", &BTreeMap::new()),
            Err(FormulaError::UnknownVariables { .. }) | Err(FormulaError::Syntax { .. })
        ));
    }

    #[test]
    fn non_finite_result_is_an_error() {
        let f = Formula::parse("1/D", &BTreeMap::new()).unwrap();
        assert!(f.evaluate(0.0).is_err());
    }
}
