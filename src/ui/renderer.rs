/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Compose the next frame into `front` (array of Cell)
///   2. Compare each cell with `back` (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Animation classes on the points/hand/acknowledgement nodes become
/// background colours, so a flash is visible exactly while its class is on
/// the node.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::element::{
    ElementAccessor, NodeHandle, ORDER_DIRECTION_BUY, ORDER_DIRECTION_SELL, ORDER_PRICE,
    ORDER_SUIT, ORDER_TYPE_CANCEL, ORDER_TYPE_LIMIT, ORDER_TYPE_MARKET, SUITS,
};
use crate::sim::countdown::Reading;
use crate::sim::desk::{hand_id, Desk, POINTS_ID};
use crate::sim::document::Document;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    /// Write a string at (x, y); returns the column after the last char.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) -> usize {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width {
                break;
            }
            self.set(cx, y, Cell { ch, fg, bg });
            cx += 1;
        }
        cx
    }
}

/// Colours for a node according to the animation classes it carries.
fn class_colors(classes: &[&str]) -> (Color, Color) {
    if classes.contains(&"buy-animated") {
        (Color::Black, Color::Green)
    } else if classes.contains(&"sell-animated") {
        (Color::White, Color::Red)
    } else if classes.contains(&"animated") {
        (Color::Black, Color::Yellow)
    } else {
        (Color::White, Cell::BASE_BG)
    }
}

// ── Renderer ──

const LABEL_COL: usize = 2;
const VALUE_COL: usize = 14;

const TITLE_ROW: usize = 0;
const FORM_ROW: usize = 2;
const SCORE_ROW: usize = 9;
const ACK_ROW: usize = 12;

/// Everything one frame shows besides the document itself.
pub struct FrameInfo<'a> {
    pub desk: &'a Desk,
    pub clock: Option<Reading>,
    pub status: &'a str,
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, doc: &Document, info: &FrameInfo<'_>) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.front.clear();
        self.compose_title(info);
        self.compose_form(doc);
        self.compose_scores(doc, info.desk);
        self.compose_activity(doc, info.desk);
        self.compose_clock(info.clock);
        if let Some(body) = doc.modal() {
            self.compose_modal(body);
        }

        self.flush_diff()
    }

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last: Option<(Color, Color)> = None;
        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let i = y * self.front.width + x;
                let cell = self.front.cells[i];
                if cell == self.back.cells[i] {
                    continue;
                }
                queue!(self.writer, MoveTo(x as u16, y as u16))?;
                if last != Some((cell.fg, cell.bg)) {
                    queue!(self.writer, SetForegroundColor(cell.fg), SetBackgroundColor(cell.bg))?;
                    last = Some((cell.fg, cell.bg));
                }
                queue!(self.writer, Print(cell.ch))?;
            }
        }
        self.writer.flush()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Composition ──

    fn compose_title(&mut self, info: &FrameInfo<'_>) {
        let bg = Cell::BASE_BG;
        let col = self.front.put_str(LABEL_COL, TITLE_ROW, "FIGGIE DESK", Color::Cyan, bg);
        let round = format!("   round {}", info.desk.round());
        let col = self.front.put_str(col, TITLE_ROW, &round, Color::DarkGrey, bg);
        self.front.put_str(col + 3, TITLE_ROW, info.status, Color::Yellow, bg);
    }

    fn radio(&mut self, x: usize, y: usize, doc: &Document, id: &str, label: &str) -> usize {
        let on = doc.checked(id).unwrap_or(false);
        let mark = if on { "(•) " } else { "( ) " };
        let fg = if on { Color::White } else { Color::DarkGrey };
        let x = self.front.put_str(x, y, mark, fg, Cell::BASE_BG);
        self.front.put_str(x, y, label, fg, Cell::BASE_BG) + 3
    }

    fn compose_form(&mut self, doc: &Document) {
        let bg = Cell::BASE_BG;
        let dim = Color::DarkGrey;

        let y = FORM_ROW;
        self.front.put_str(LABEL_COL, y, "Direction", dim, bg);
        let x = self.radio(VALUE_COL, y, doc, ORDER_DIRECTION_BUY, "buy [A]");
        self.radio(x, y, doc, ORDER_DIRECTION_SELL, "sell [S]");

        let y = FORM_ROW + 1;
        self.front.put_str(LABEL_COL, y, "Suit", dim, bg);
        let current = doc.value(ORDER_SUIT);
        let mut x = VALUE_COL;
        for suit in SUITS {
            let on = current.as_deref().and_then(|v| v.chars().next()) == Some(suit);
            let label = format!(" {} [{}] ", suit, suit.to_ascii_uppercase());
            let (fg, cell_bg) = if on { (Color::Black, Color::Cyan) } else { (dim, bg) };
            x = self.front.put_str(x, y, &label, fg, cell_bg) + 1;
        }

        let y = FORM_ROW + 2;
        self.front.put_str(LABEL_COL, y, "Type", dim, bg);
        let x = self.radio(VALUE_COL, y, doc, ORDER_TYPE_LIMIT, "limit [Z]");
        let x = self.radio(x, y, doc, ORDER_TYPE_MARKET, "market [X]");
        self.radio(x, y, doc, ORDER_TYPE_CANCEL, "cancel [C]");

        let y = FORM_ROW + 3;
        self.front.put_str(LABEL_COL, y, "Price", dim, bg);
        let focused = doc.active_element() == Some(ORDER_PRICE);
        let field = match (doc.value(ORDER_PRICE), doc.disabled(ORDER_PRICE)) {
            (None, _) => None,
            (Some(_), Some(true)) => Some(("[   ---    ]".to_string(), dim)),
            (Some(v), _) => {
                let caret = if focused { "_" } else { " " };
                let fg = if focused { Color::Cyan } else { Color::White };
                Some((format!("[ {:<8}{}]", v, caret), fg))
            }
        };
        if let Some((text, fg)) = field {
            self.front.put_str(VALUE_COL, y, &text, fg, bg);
        }

        let help = "Enter submit  Bksp delete  Tab price  ? help  Esc quit";
        self.front.put_str(LABEL_COL, FORM_ROW + 5, help, dim, bg);
    }

    fn node_label(&mut self, x: usize, y: usize, doc: &Document, node: Option<NodeHandle>) -> usize {
        let node = match node {
            Some(n) => n,
            None => return x,
        };
        let text = format!(" {} ", doc.node_text(node).unwrap_or(""));
        let (fg, bg) = class_colors(&doc.node_classes(node));
        self.front.put_str(x, y, &text, fg, bg) + 1
    }

    fn compose_scores(&mut self, doc: &Document, desk: &Desk) {
        let bg = Cell::BASE_BG;
        self.front.put_str(LABEL_COL, SCORE_ROW, "Points", Color::DarkGrey, bg);
        self.node_label(VALUE_COL, SCORE_ROW, doc, desk.node_for(POINTS_ID));

        let y = SCORE_ROW + 1;
        self.front.put_str(LABEL_COL, y, "Hand", Color::DarkGrey, bg);
        let mut x = VALUE_COL;
        for suit in SUITS {
            x = self.front.put_str(x, y, &suit.to_string(), Color::White, bg);
            x = self.node_label(x, y, doc, desk.node_for(&hand_id(suit))) + 1;
        }
    }

    fn compose_activity(&mut self, doc: &Document, desk: &Desk) {
        let bg = Cell::BASE_BG;
        self.front.put_str(LABEL_COL, ACK_ROW, "Orders", Color::DarkGrey, bg);
        for (i, node) in desk.ack_nodes().enumerate() {
            self.node_label(VALUE_COL, ACK_ROW + i, doc, Some(node));
        }

        let half = (self.front.width / 2).max(VALUE_COL + 24);
        self.front.put_str(half, ACK_ROW, "Trades", Color::DarkGrey, bg);
        let rows = self.front.height.saturating_sub(ACK_ROW + 4).max(1);
        for (i, line) in doc.history_window(rows).iter().enumerate() {
            self.front.put_str(half + 8, ACK_ROW + i, line, Color::White, bg);
        }
    }

    fn compose_clock(&mut self, clock: Option<Reading>) {
        let reading = match clock {
            Some(r) => r,
            None => return,
        };
        let y = self.front.height.saturating_sub(1);
        let width = self.front.width.saturating_sub(LABEL_COL * 2 + 8);
        let filled = (width as f64 * reading.fraction).round() as usize;
        let color = if reading.danger { Color::Red } else { Color::Green };

        let bar: String = "█".repeat(filled) + &"░".repeat(width - filled.min(width));
        let x = self.front.put_str(LABEL_COL, y, &bar, color, Cell::BASE_BG);
        self.front.put_str(x + 1, y, &format!("{:>4}s", reading.seconds), color, Cell::BASE_BG);
    }

    fn compose_modal(&mut self, body: &str) {
        let w = (body.chars().count() + 6).min(self.front.width);
        let h = 5;
        let x0 = self.front.width.saturating_sub(w) / 2;
        let y0 = self.front.height.saturating_sub(h) / 2;
        let box_bg = Color::DarkBlue;
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                self.front.set(x, y, Cell { ch: ' ', fg: Color::White, bg: box_bg });
            }
        }
        self.front.put_str(x0 + 3, y0 + 1, body, Color::White, box_bg);
        self.front.put_str(x0 + 3, y0 + 3, "any key closes", Color::Grey, box_bg);
    }
}
