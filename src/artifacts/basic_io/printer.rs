use crate::artifacts::core::file_path::FilePath;

/// One block of `key value...` lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stanza {
    entries: Vec<(String, String)>,
}

impl Stanza {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str_pair(&mut self, key: &str, value: &str) -> &mut Self {
        self.entries.push((key.to_string(), escape(value)));
        self
    }

    pub fn push_file_pair(&mut self, key: &str, path: &FilePath) -> &mut Self {
        self.push_str_pair(key, &path.to_string())
    }

    pub fn push_hex_pair(&mut self, key: &str, hex: &str) -> &mut Self {
        self.entries.push((key.to_string(), format!("[{}]", hex)));
        self
    }

    pub fn push_str_triple(&mut self, key: &str, first: &str, second: &str) -> &mut Self {
        self.entries
            .push((key.to_string(), format!("{} {}", escape(first), escape(second))));
        self
    }

    pub fn push_str_hex_triple(&mut self, key: &str, first: &str, hex: &str) -> &mut Self {
        self.entries
            .push((key.to_string(), format!("{} [{}]", escape(first), hex)));
        self
    }

    fn key_width(&self) -> usize {
        self.entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0)
    }
}

/// Quote a string, escaping `"` and `\`
pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 2);
    escaped.push('"');
    for c in raw.chars() {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('"');
    escaped
}

/// Accumulates stanzas separated by blank lines, keys right-aligned
#[derive(Debug, Default)]
pub struct Printer {
    out: String,
}

impl Printer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_stanza(&mut self, stanza: &Stanza) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }

        let width = stanza.key_width();
        for (key, value) in &stanza.entries {
            self.out
                .push_str(&format!("{:>width$} {}\n", key, value, width = width));
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}
