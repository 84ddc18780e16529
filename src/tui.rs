use crossterm::{
    cursor::MoveToPreviousLine,
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};

#[derive(Clone, Copy, PartialEq)]
enum PageStatus {
    Done,
    Skipped,
}

/// Live page-by-page progress for a crawl, redrawn in place.
pub struct CrawlTUI {
    out: Box<dyn Write>,
    max_pages: usize,
    pages: Vec<PageStatus>,
    accepted: usize,
    progress_line_printed: bool,
}

impl CrawlTUI {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self {
            out,
            max_pages: 0,
            pages: Vec::new(),
            accepted: 0,
            progress_line_printed: false,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn start_crawl(&mut self, max_pages: usize, base_url: &str) -> io::Result<()> {
        self.max_pages = max_pages;
        execute!(
            self.out,
            SetForegroundColor(Color::White),
            Print(format!("🕸  Crawling {} page(s) of {}\n", max_pages, base_url)),
            ResetColor
        )?;
        self.print_progress_line()
    }

    pub fn page_done(&mut self, page: usize, entries: usize, accepted: usize) -> io::Result<()> {
        self.pages.push(PageStatus::Done);
        self.accepted += accepted;
        self.print_page_line(
            Color::Green,
            format!("  ✅ Page {}: {} entries, {} new or changed", page, entries, accepted),
        )
    }

    pub fn page_skipped(&mut self, page: usize) -> io::Result<()> {
        self.pages.push(PageStatus::Skipped);
        self.print_page_line(Color::Red, format!("  ❌ Page {}: could not be retrieved, skipped", page))
    }

    pub fn finish(&mut self, new_products: usize, store_total: usize) -> io::Result<()> {
        self.clear_progress_line()?;
        let skipped = self.skipped_count();

        execute!(
            self.out,
            Print("─".repeat(60)),
            Print("\n"),
            SetForegroundColor(Color::Green),
            Print(format!("Scraping completed. {} new products added.", new_products)),
            ResetColor
        )?;
        if skipped > 0 {
            execute!(
                self.out,
                SetForegroundColor(Color::Red),
                Print(format!(" {} page(s) skipped.", skipped)),
                ResetColor
            )?;
        }
        execute!(
            self.out,
            SetForegroundColor(Color::DarkGrey),
            Print(format!(" | Store: {} total\n", store_total)),
            ResetColor
        )
    }

    fn skipped_count(&self) -> usize {
        self.pages.iter().filter(|s| **s == PageStatus::Skipped).count()
    }

    fn print_page_line(&mut self, color: Color, line: String) -> io::Result<()> {
        self.clear_progress_line()?;
        execute!(self.out, SetForegroundColor(color), Print(line), Print("\n"), ResetColor)?;
        self.print_progress_line()
    }

    fn print_progress_line(&mut self) -> io::Result<()> {
        let text = self.progress_text();
        execute!(
            self.out,
            SetForegroundColor(Color::White),
            Print(text),
            Print("\n"),
            ResetColor
        )?;
        self.progress_line_printed = true;
        Ok(())
    }

    fn clear_progress_line(&mut self) -> io::Result<()> {
        if self.progress_line_printed {
            execute!(self.out, MoveToPreviousLine(1), Clear(ClearType::CurrentLine))?;
            self.progress_line_printed = false;
        }
        Ok(())
    }

    fn progress_text(&self) -> String {
        let done = self.pages.len();
        let total = self.max_pages.max(1);
        let bar_width = 30;
        let filled = (done.min(total) * bar_width) / total;

        format!(
            "Pages: [{}{}] {}/{} | {} new or changed",
            "█".repeat(filled),
            "░".repeat(bar_width - filled),
            done,
            self.max_pages,
            self.accepted
        )
    }
}
