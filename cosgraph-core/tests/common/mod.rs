//! Hand-built PDF files with exact offsets

#![allow(dead_code)]

use std::collections::BTreeMap;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct PdfBuilder {
    data: Vec<u8>,
    offsets: BTreeMap<u32, usize>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            data: b"%PDF-1.5\n".to_vec(),
            offsets: BTreeMap::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.data.len()
    }

    pub fn offset_of(&self, number: u32) -> usize {
        self.offsets[&number]
    }

    /// `n 0 obj <body> endobj`
    pub fn object(&mut self, number: u32, body: &str) -> &mut Self {
        self.offsets.insert(number, self.data.len());
        self.data
            .extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
        self
    }

    /// Stream object; `dict` is written verbatim, so it must carry its own
    /// `/Length`.
    pub fn stream(&mut self, number: u32, dict: &str, body: &[u8]) -> &mut Self {
        self.offsets.insert(number, self.data.len());
        self.data
            .extend_from_slice(format!("{number} 0 obj\n{dict}\nstream\n").as_bytes());
        self.data.extend_from_slice(body);
        self.data.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    /// Object stream holding `members` (number, source) in order.
    pub fn object_stream(&mut self, number: u32, members: &[(u32, &str)]) -> &mut Self {
        let mut header = String::new();
        let mut objects = String::new();
        for (member, source) in members {
            header.push_str(&format!("{} {} ", member, objects.len()));
            objects.push_str(source);
            objects.push(' ');
        }
        let body = format!("{header}{objects}");
        let dict = format!(
            "<< /Type /ObjStm /N {} /First {} /Length {} >>",
            members.len(),
            header.len(),
            body.len()
        );
        self.stream(number, &dict, body.as_bytes())
    }

    /// Traditional table listing `numbers` (0 is written as the free head),
    /// then the trailer and `startxref`. Returns the table's offset.
    pub fn xref_table(&mut self, numbers: &[u32], trailer: &str) -> usize {
        let start = self.data.len();
        let mut table = String::from("xref\n");
        for number in numbers {
            if *number == 0 {
                table.push_str("0 1\n0000000000 65535 f \n");
            } else {
                table.push_str(&format!(
                    "{} 1\n{:010} 00000 n \n",
                    number, self.offsets[number]
                ));
            }
        }
        table.push_str(&format!("trailer\n{trailer}\nstartxref\n{start}\n%%EOF\n"));
        self.data.extend_from_slice(table.as_bytes());
        start
    }

    /// Cross-reference stream object `number` with `/W [1 4 2]` rows for
    /// `rows` (number, type, field 2, field 3), ending the file.
    pub fn xref_stream(&mut self, number: u32, rows: &[(u32, u8, u32, u16)], extra: &str) -> usize {
        let start = self.data.len();
        let mut body = Vec::new();
        let mut index = String::new();
        for (object, kind, second, third) in rows {
            index.push_str(&format!("{object} 1 "));
            body.push(*kind);
            body.extend_from_slice(&second.to_be_bytes());
            body.extend_from_slice(&third.to_be_bytes());
        }
        let size = rows.iter().map(|row| row.0).max().unwrap_or(0) + 1;
        let dict = format!(
            "<< /Type /XRef /W [1 4 2] /Index [{}] /Size {} /Length {} {} >>",
            index.trim_end(),
            size,
            body.len(),
            extra
        );
        self.stream(number, &dict, &body);
        self.data
            .extend_from_slice(format!("startxref\n{start}\n%%EOF\n").as_bytes());
        start
    }

    pub fn finish(&self) -> Vec<u8> {
        self.data.clone()
    }
}

/// Catalog (1), page tree (2), one page (3) with a content stream (4)
/// whose length is the indirect integer 5.
pub fn simple_pdf() -> Vec<u8> {
    let mut pdf = PdfBuilder::new();
    pdf.object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>",
        )
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Title (D:20230501120000Z) >>",
        )
        .stream(4, "<< /Length 5 0 R >>", b"BT ET")
        .object(5, "5");
    pdf.xref_table(&[0, 1, 2, 3, 4, 5], "<< /Size 6 /Root 1 0 R >>");
    pdf.finish()
}

/// Catalog (1) standalone, page tree (3) and page (4) inside object
/// stream 2, cross-reference stream 5.
pub fn compressed_pdf() -> Vec<u8> {
    let mut pdf = PdfBuilder::new();
    pdf.object(1, "<< /Type /Catalog /Pages 3 0 R >>");
    pdf.object_stream(
        2,
        &[
            (3, "<< /Type /Pages /Kids [4 0 R] /Count 1 >>"),
            (4, "<< /Type /Page /Parent 3 0 R /MediaBox [0 0 100 100] >>"),
        ],
    );
    let catalog = pdf.offset_of(1) as u32;
    let container = pdf.offset_of(2) as u32;
    let xref = pdf.position() as u32;
    pdf.xref_stream(
        5,
        &[
            (0, 0, 0, 65535),
            (1, 1, catalog, 0),
            (2, 1, container, 0),
            (3, 2, 2, 0),
            (4, 2, 2, 1),
            (5, 1, xref, 0),
        ],
        "/Root 1 0 R",
    );
    pdf.finish()
}
