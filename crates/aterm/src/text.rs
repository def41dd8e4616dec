use std::fmt;

use crate::{ATerm, TermPool};

/// Failure to parse the textual representation of a term.
#[derive(Debug, PartialEq, Eq)]
pub struct ParseError {
    message: String,
    position: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at offset {}: {}", self.position, self.message)
    }
}

impl std::error::Error for ParseError {}

impl TermPool {
    /// Parses the textual representation of a term, e.g. "f(g(a),b)",
    /// "[a,b,c]" or "42". Quoted names may contain arbitrary characters.
    pub fn from_string(&mut self, text: &str) -> Result<ATerm, ParseError> {
        let mut parser = Parser {
            input: text.as_bytes(),
            position: 0,
        };

        parser.skip_whitespace();
        let term = parser.parse_term(self)?;
        parser.skip_whitespace();

        if parser.position != parser.input.len() {
            return Err(parser.error("trailing input after term"));
        }

        Ok(term)
    }
}

struct Parser<'a> {
    input: &'a [u8],
    position: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            position: self.position,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: u8) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.position += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected as char)))
        }
    }

    fn parse_term(&mut self, tp: &mut TermPool) -> Result<ATerm, ParseError> {
        self.skip_whitespace();

        match self.peek() {
            Some(b'[') => self.parse_list(tp),
            Some(b'"') => {
                let name = self.parse_quoted_name()?;
                self.parse_application(tp, &name, true)
            }
            Some(c) if c == b'-' || c.is_ascii_digit() => self.parse_int(tp),
            Some(c) if c == b'_' || c.is_ascii_alphabetic() => {
                let name = self.parse_name();
                self.parse_application(tp, &name, false)
            }
            _ => Err(self.error("expected a term")),
        }
    }

    fn parse_application(
        &mut self,
        tp: &mut TermPool,
        name: &str,
        quoted: bool,
    ) -> Result<ATerm, ParseError> {
        let mut args = Vec::new();

        self.skip_whitespace();
        if self.peek() == Some(b'(') {
            self.position += 1;
            loop {
                args.push(self.parse_term(tp)?);
                self.skip_whitespace();
                match self.peek() {
                    Some(b',') => {
                        self.position += 1;
                    }
                    Some(b')') => {
                        self.position += 1;
                        break;
                    }
                    _ => return Err(self.error("expected ',' or ')'")),
                }
            }
        }

        let symbol = if quoted {
            tp.create_symbol_quoted(name, args.len())
        } else {
            tp.create_symbol(name, args.len())
        };
        Ok(tp.create(&symbol, &args))
    }

    fn parse_list(&mut self, tp: &mut TermPool) -> Result<ATerm, ParseError> {
        self.expect(b'[')?;
        self.skip_whitespace();

        let mut elements = Vec::new();
        if self.peek() == Some(b']') {
            self.position += 1;
            return Ok(tp.empty_list());
        }

        loop {
            elements.push(self.parse_term(tp)?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.position += 1;
                }
                Some(b']') => {
                    self.position += 1;
                    break;
                }
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }

        Ok(tp.list(&elements))
    }

    fn parse_int(&mut self, tp: &mut TermPool) -> Result<ATerm, ParseError> {
        let start = self.position;
        if self.peek() == Some(b'-') {
            self.position += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.position += 1;
        }

        let text = std::str::from_utf8(&self.input[start..self.position]).unwrap();
        let value: i64 = text
            .parse()
            .map_err(|_| self.error("integer literal out of range"))?;
        Ok(tp.create_int(value))
    }

    fn parse_name(&mut self) -> String {
        let start = self.position;
        while matches!(self.peek(), Some(c) if c == b'_' || c == b'\'' || c.is_ascii_alphanumeric())
        {
            self.position += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.position]).into_owned()
    }

    fn parse_quoted_name(&mut self) -> Result<String, ParseError> {
        self.expect(b'"')?;
        let start = self.position;
        while matches!(self.peek(), Some(c) if c != b'"') {
            self.position += 1;
        }
        let name = String::from_utf8_lossy(&self.input[start..self.position]).into_owned();
        self.expect(b'"')?;
        Ok(name)
    }
}

/// Lists and integers are printed in their surface syntax.
impl fmt::Display for ATerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(value) = self.int_value() {
            return write!(f, "{}", value);
        }

        if self.is_list() {
            write!(f, "[")?;
            let mut current = self.clone();
            let mut first = true;
            while !current.is_empty_list() {
                if !first {
                    write!(f, ",")?;
                }
                write!(f, "{}", current.arg(0))?;
                current = current.arg(1).clone();
                first = false;
            }
            return write!(f, "]");
        }

        write!(f, "{}", self.head_symbol())?;
        if !self.arguments().is_empty() {
            write!(f, "(")?;
            for (index, arg) in self.arguments().iter().enumerate() {
                if index > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ")")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;
    use test_log::test;

    use crate::TermPool;

    #[test_case("f(g(a),b)" ; "application")]
    #[test_case("[a,b,c]" ; "list")]
    #[test_case("[]" ; "empty list")]
    #[test_case("42" ; "integer")]
    #[test_case("-7" ; "negative integer")]
    #[test_case("f" ; "constant")]
    #[test_case("\"quoted name\"(a)" ; "quoted symbol")]
    fn test_roundtrip(text: &str) {
        let mut tp = TermPool::new();
        let term = tp.from_string(text).unwrap();
        assert_eq!(format!("{}", term), text);
    }

    #[test]
    fn test_parse_errors() {
        let mut tp = TermPool::new();
        assert!(tp.from_string("f(").is_err());
        assert!(tp.from_string("f(a))").is_err());
        assert!(tp.from_string("").is_err());
        assert!(tp.from_string("[a,]").is_err());
    }

    #[test]
    fn test_parse_whitespace() {
        let mut tp = TermPool::new();
        let t1 = tp.from_string(" f( a , b ) ").unwrap();
        let t2 = tp.from_string("f(a,b)").unwrap();
        assert_eq!(t1, t2);
    }
}
