/// One table row as stored on disk: textual field values in schema
/// column order. A row whose fields are all empty is a tombstone; it
/// keeps its slot so live row positions never shift.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub fields: Vec<String>,
}

impl Row {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// All-empty row marking a deleted slot.
    pub fn empty(width: usize) -> Self {
        Self {
            fields: vec![String::new(); width],
        }
    }

    pub fn is_tombstone(&self) -> bool {
        !self.fields.iter().any(|field| !field.is_empty())
    }

    pub fn to_csv_line(&self) -> String {
        Self::encode_csv(&self.fields)
    }

    pub fn from_csv_line(line: &str) -> Self {
        Self::new(Self::decode_csv(line))
    }

    /// Encode fields as one comma-separated line, quoting only fields
    /// that would otherwise break the line structure.
    pub fn encode_csv(fields: &[String]) -> String {
        fields
            .iter()
            .map(|field| escape_field(field))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Decode one comma-separated line. Lenient: unterminated quoting
    /// degrades to literal text instead of failing the whole page.
    pub fn decode_csv(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut chars = line.chars().peekable();
        let mut in_quotes = false;
        while let Some(c) = chars.next() {
            if in_quotes {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        current.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    current.push(c);
                }
            } else {
                match c {
                    '"' => in_quotes = true,
                    ',' => fields.push(std::mem::take(&mut current)),
                    _ => current.push(c),
                }
            }
        }
        fields.push(current);
        fields
    }
}

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
