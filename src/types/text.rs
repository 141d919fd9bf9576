//! Parsing of raw type text as written in declarations.
//!
//! Handles generic arguments, arrays, varargs, wildcards, C# nullables and
//! annotations. Anything else (tuples, function pointer syntax) is rejected
//! and ends up as the unknown type.

/// Structured form of a declared type such as `Map<String, List<Integer>>[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeText {
    /// Base name, possibly qualified (`java.util.Map`, `Map.Entry`).
    pub name: String,
    pub args: Vec<TypeText>,
    pub array_dims: usize,
}

impl TypeText {
    pub fn parse(text: &str) -> Option<TypeText> {
        let cleaned = strip_annotations(text);
        let mut parser = Parser {
            chars: cleaned.chars().collect(),
            pos: 0,
        };
        let parsed = parser.parse_type()?;
        parser.skip_ws();
        (parser.pos == parser.chars.len()).then_some(parsed)
    }

    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            array_dims: 0,
        }
    }

    /// Last segment of the base name.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn is_void(&self) -> bool {
        self.array_dims == 0 && self.args.is_empty() && self.name == "void"
    }

    pub fn is_generic(&self) -> bool {
        !self.args.is_empty()
    }

    /// The same type with one array dimension removed.
    pub fn element(&self) -> TypeText {
        TypeText {
            name: self.name.clone(),
            args: self.args.clone(),
            array_dims: self.array_dims.saturating_sub(1),
        }
    }
}

fn strip_annotations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '@' {
            out.push(c);
            continue;
        }
        while chars
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
        {
            chars.next();
        }
        if chars.peek() == Some(&'(') {
            let mut depth = 0usize;
            for c in chars.by_ref() {
                match c {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
    }
    out
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<String> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    fn parse_type(&mut self) -> Option<TypeText> {
        self.skip_ws();
        if self.eat('?') {
            // Wildcards: `?`, `? extends X`, `? super X`
            let save = self.pos;
            match self.ident().as_deref() {
                Some("extends") | Some("super") => return self.parse_type(),
                _ => {
                    self.pos = save;
                    return Some(TypeText::simple("?"));
                }
            }
        }

        let mut name = self.ident()?;
        for modifier in ["params", "ref", "out", "in", "final", "const", "scoped"] {
            if name == modifier {
                name = self.ident()?;
            }
        }
        if name == "global" && self.eat(':') && self.eat(':') {
            name = self.ident()?;
        }

        let mut args = Vec::new();
        loop {
            if self.eat('<') {
                args.clear();
                if !self.eat('>') {
                    loop {
                        args.push(self.parse_type()?);
                        if self.eat('>') {
                            break;
                        }
                        if !self.eat(',') {
                            return None;
                        }
                    }
                }
            }
            self.skip_ws();
            if self.peek() == Some('.') && self.chars.get(self.pos + 1) != Some(&'.') {
                self.pos += 1;
                let segment = self.ident()?;
                name.push('.');
                name.push_str(&segment);
                continue;
            }
            break;
        }

        let mut array_dims = 0;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('[') => {
                    self.pos += 1;
                    while self.eat(',') {}
                    if !self.eat(']') {
                        return None;
                    }
                    array_dims += 1;
                }
                Some('?') => self.pos += 1,
                Some('*') => self.pos += 1,
                Some('.') => {
                    for _ in 0..3 {
                        if !self.eat('.') {
                            return None;
                        }
                    }
                    array_dims += 1;
                }
                _ => break,
            }
        }

        Some(TypeText {
            name,
            args,
            array_dims,
        })
    }
}
