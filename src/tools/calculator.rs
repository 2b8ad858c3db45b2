//! Calculator 工具：园艺相关的算术计算
//!
//! 安全门是一张字符白名单（数字、+-*/()、小数点与空格）；含任何其他字符直接拒绝。
//! 白名单不做语法校验，括号不配对等「字符合法但表达式畸形」的输入由求值器自身报错，
//! 统一以 Calculation error 字符串收尾。

use crate::tools::ToolOutcome;

/// 表达式字符白名单
fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '(' | ')' | '.' | ' ')
}

/// 递归下降求值器：expr := term (('+'|'-') term)*; term := factor (('*'|'/') factor)*;
/// factor := '-' factor | '(' expr ')' | number
struct Parser<'a> {
    chars: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.as_bytes(),
            pos: 0,
        }
    }

    fn skip_spaces(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos] == b' ' {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_spaces();
        self.chars.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                b'+' => {
                    self.pos += 1;
                    value += self.term()?;
                }
                b'-' => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                b'*' => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                b'/' => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek() != Some(b')') {
                    return Err("unbalanced parentheses".to_string());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) => Err(format!("unexpected character '{}'", c as char)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        self.skip_spaces();
        let start = self.pos;
        while self.pos < self.chars.len()
            && (self.chars[self.pos].is_ascii_digit() || self.chars[self.pos] == b'.')
        {
            self.pos += 1;
        }
        let literal = std::str::from_utf8(&self.chars[start..self.pos])
            .map_err(|_| "invalid number".to_string())?;
        literal
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{}'", literal))
    }

    fn finish(&mut self) -> Result<(), String> {
        if self.peek().is_some() {
            return Err("trailing input after expression".to_string());
        }
        Ok(())
    }
}

/// 求值白名单内的算术表达式
pub fn calculate(expression: &str) -> Result<f64, String> {
    let mut parser = Parser::new(expression);
    let value = parser.expr()?;
    parser.finish()?;
    if !value.is_finite() {
        return Err("result is not finite".to_string());
    }
    Ok(value)
}

/// 执行 calculator 工具：白名单校验 → 求值；两类失败分别返回不同的描述
pub fn run(expression: &str) -> ToolOutcome {
    let expression = expression.trim();
    if expression.is_empty() || !expression.chars().all(is_allowed) {
        return ToolOutcome::Failure(
            "Invalid calculation expression. Use only numbers and +, -, *, /, (, )".to_string(),
        );
    }
    match calculate(expression) {
        Ok(value) => ToolOutcome::Success(format!("Result: {}", value)),
        Err(e) => ToolOutcome::Failure(format!("Calculation error: {}", e)),
    }
}
