//! Fixed-layout A4 report rendering. The output is deterministic for a
//! given (quotes, report, correlations) triple and must not fail when
//! correlation data or narrative text is empty.

use crate::domain::quote::{CorrelationPoint, QuoteSnapshot};
use crate::domain::report::Report;
use anyhow::Context;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_MM: f64 = 20.0;

const H1_SIZE: f64 = 22.0;
const H2_SIZE: f64 = 14.0;
const BODY_SIZE: f64 = 10.0;
const SMALL_SIZE: f64 = 8.0;

// Points to millimetres, and a mean Helvetica advance for wrapping text
// against the built-in font (no embedded metrics).
const PT_TO_MM: f64 = 0.3528;
const CHAR_WIDTH_FACTOR: f64 = 0.5;

/// Column x offsets for the summary table, in mm from the left edge.
const TABLE_COLS: [f64; 7] = [20.0, 40.0, 85.0, 110.0, 130.0, 155.0, 185.0];
const TABLE_HEADERS: [&str; 7] = [
    "Ticker",
    "Empresa",
    "Atual",
    "Variação",
    "Sem. Anterior",
    "Volatilidade",
    "RSI",
];

pub fn render_pdf(
    quotes: &[QuoteSnapshot],
    report: &Report,
    correlations: &[CorrelationPoint],
) -> anyhow::Result<Vec<u8>> {
    let mut page = Page::new("Carteira Inteligente")?;

    page.heading(H1_SIZE, "Carteira Inteligente");
    page.small(&format!("Relatório Semanal — {}", report.generated_label()));
    page.rule();
    page.gap(3.0);

    page.heading(H2_SIZE, "Resumo da Carteira");
    page.table_row(&TABLE_HEADERS, true);
    for quote in quotes {
        let name: String = quote.asset.name.chars().take(24).collect();
        page.table_row(
            &[
                &quote.asset.ticker,
                &name,
                &quote.price_label(),
                &format!("{:+.2}%", quote.variation),
                &format!("{:+.2}%", quote.prior_variation),
                &format!("{:.2}%", quote.volatility),
                &format!("{:.0}", quote.rsi),
            ],
            false,
        );
    }
    page.gap(3.0);

    if !correlations.is_empty() {
        page.heading(H2_SIZE, "Correlações do Mercado");
        for point in correlations {
            page.body(&format!(
                "{}: {:+.2}% (atual: {:.2})",
                point.name, point.variation, point.level
            ));
        }
        page.gap(3.0);
    }

    page.heading(H2_SIZE, "Análise de Mercado — IA");
    page.prose(&report.analysis);

    page.heading(H2_SIZE, "Recomendações — IA");
    page.prose(&report.recommendations);

    page.gap(4.0);
    page.rule();
    page.small("Relatório informativo. Não é consultoria financeira oficial.");
    page.small("Dados: provedor de mercado · IA: Groq LLaMA 3.3 70B");

    page.finish()
}

/// Strips the markdown control characters the narrative tends to carry.
pub fn strip_markup(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '#' | '*' | '`')).collect()
}

struct Page {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f64,
}

impl Page {
    fn new(title: &str) -> anyhow::Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .context("failed to register Helvetica")?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .context("failed to register Helvetica-Bold")?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        })
    }

    fn line_height(size: f64) -> f64 {
        size * PT_TO_MM * 1.45
    }

    fn ensure_space(&mut self, needed: f64) {
        if self.y - needed >= MARGIN_MM {
            return;
        }
        let (page, layer) =
            self.doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT_MM - MARGIN_MM;
    }

    fn write(&mut self, text: &str, size: f64, bold: bool, x: f64) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn heading(&mut self, size: f64, text: &str) {
        self.ensure_space(Self::line_height(size) + 2.0);
        self.y -= Self::line_height(size);
        self.write(text, size, true, MARGIN_MM);
        self.y -= 2.0;
    }

    fn body(&mut self, text: &str) {
        self.ensure_space(Self::line_height(BODY_SIZE));
        self.y -= Self::line_height(BODY_SIZE);
        self.write(text, BODY_SIZE, false, MARGIN_MM);
    }

    fn small(&mut self, text: &str) {
        self.ensure_space(Self::line_height(SMALL_SIZE));
        self.y -= Self::line_height(SMALL_SIZE);
        self.write(text, SMALL_SIZE, false, MARGIN_MM);
    }

    fn gap(&mut self, mm: f64) {
        self.y -= mm;
    }

    fn rule(&mut self) {
        self.ensure_space(2.0);
        self.y -= 1.5;
        let line = Line {
            points: vec![
                (Point::new(Mm(MARGIN_MM), Mm(self.y)), false),
                (Point::new(Mm(PAGE_WIDTH_MM - MARGIN_MM), Mm(self.y)), false),
            ],
            is_closed: false,
        };
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.10, 0.34, 0.86, None)));
        self.layer.set_outline_thickness(0.75);
        self.layer.add_line(line);
        self.y -= 1.5;
    }

    fn table_row(&mut self, cells: &[&str; 7], header: bool) {
        self.ensure_space(Self::line_height(SMALL_SIZE));
        self.y -= Self::line_height(SMALL_SIZE);
        for (cell, x) in cells.iter().zip(TABLE_COLS.iter()) {
            self.write(cell, SMALL_SIZE, header, *x);
        }
    }

    /// Markdown-stripped narrative, one wrapped paragraph per non-empty
    /// source line. Empty text renders nothing.
    fn prose(&mut self, text: &str) {
        let cleaned = strip_markup(text);
        let max_chars = wrap_width(BODY_SIZE);
        for line in cleaned.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            for wrapped in wrap(line, max_chars) {
                self.body(&wrapped);
            }
        }
        self.gap(2.0);
    }

    fn finish(self) -> anyhow::Result<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .context("failed to serialize PDF document")
    }
}

fn wrap_width(size: f64) -> usize {
    let content_mm = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
    (content_mm / (size * PT_TO_MM * CHAR_WIDTH_FACTOR)).floor() as usize
}

fn wrap(line: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
