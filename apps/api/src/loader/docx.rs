//! DOCX text extraction via `docx-rs`.

use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};

use crate::loader::{DocumentFormat, LoadError, RawExtraction};

/// Extracts paragraph text in document order. Table cells are read row by
/// row, each cell paragraph on its own line, since CV templates often lay
/// out whole sections inside tables.
pub fn extract_docx(data: &[u8]) -> Result<RawExtraction, LoadError> {
    let docx = docx_rs::read_docx(data).map_err(|e| LoadError::Parse {
        format: DocumentFormat::Docx,
        message: e.to_string(),
    })?;

    let mut text = String::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => push_paragraph(p, &mut text),
            DocumentChild::Table(t) => push_table(t, &mut text),
            _ => {}
        }
    }

    Ok(RawExtraction {
        text,
        format: DocumentFormat::Docx,
        page_count: None,
    })
}

fn push_paragraph(paragraph: &Paragraph, out: &mut String) {
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => out.push_str(&t.text),
                    RunChild::Tab(_) => out.push('\t'),
                    RunChild::Break(_) => out.push('\n'),
                    _ => {}
                }
            }
        }
    }
    out.push('\n');
}

fn push_table(table: &Table, out: &mut String) {
    for row in &table.rows {
        #[allow(irrefutable_let_patterns)]
        let TableChild::TableRow(row) = row else { continue };
        for cell in &row.cells {
            #[allow(irrefutable_let_patterns)]
            let TableRowChild::TableCell(cell) = cell else { continue };
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(p) => push_paragraph(p, out),
                    TableCellContent::Table(nested) => push_table(nested, out),
                    #[allow(unreachable_patterns)]
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Run, TableCell, TableRow};

    fn pack(docx: Docx) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_extract_docx_paragraphs_in_order() {
        let data = pack(
            Docx::new()
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("John Doe")))
                .add_paragraph(
                    Paragraph::new()
                        .add_run(Run::new().add_text("Engineer at "))
                        .add_run(Run::new().add_text("Acme Corp")),
                ),
        );

        let raw = extract_docx(&data).unwrap();
        assert_eq!(raw.format, DocumentFormat::Docx);
        let lines: Vec<&str> = raw.text.lines().collect();
        assert_eq!(lines[0], "John Doe");
        assert!(lines[1].ends_with("Acme Corp"));
    }

    #[test]
    fn test_extract_docx_reads_table_cells() {
        let table = Table::new(vec![TableRow::new(vec![
            TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("Skills"))),
            TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("Rust"))),
        ])]);
        let data = pack(Docx::new().add_table(table));

        let raw = extract_docx(&data).unwrap();
        assert!(raw.text.contains("Skills\n"));
        assert!(raw.text.contains("Rust\n"));
    }

    #[test]
    fn test_extract_docx_rejects_garbage() {
        let err = extract_docx(b"definitely not a zip archive").unwrap_err();
        assert!(matches!(
            err,
            LoadError::Parse {
                format: DocumentFormat::Docx,
                ..
            }
        ));
    }
}
