//! Interactive terminal front end
//!
//! Draws the catalog view as a card grid with a modal add-product form and a
//! log panel. Network calls run on spawned tasks that report back over a
//! channel, so the screen keeps redrawing while requests are in flight.

use crate::form::FormField;
use crate::store::KeyValueStore;
use crate::view::{CatalogView, ProductCard, Screen};
use catalog_client::{CacheTag, ClientResult, HttpClient};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{prelude::*, widgets::*};
use shared::{NewProduct, Product, ProductRecord, ProductUpdate};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget, TuiWidgetEvent, TuiWidgetState};

const COLUMNS: usize = 3;
const CARD_HEIGHT: u16 = 7;
const TICK: Duration = Duration::from_millis(100);

/// Finished network calls
enum AppEvent {
    Fetched(ClientResult<Vec<Product>>),
    Updated {
        id: u64,
        update: ProductUpdate,
        result: ClientResult<ProductRecord>,
    },
    Created {
        product: NewProduct,
        result: ClientResult<ProductRecord>,
    },
}

struct App<'a, H, S> {
    view: &'a mut CatalogView<H, S>,
    /// Selected card index
    selected: usize,
    /// Focused form field
    field: FormField,
    /// Editing buffer of the focused field
    input: Input,
    fetching: bool,
    logger_state: TuiWidgetState,
    events: mpsc::UnboundedSender<AppEvent>,
}

/// Run the interactive browser until the user quits
pub async fn run<H, S>(view: &mut CatalogView<H, S>) -> anyhow::Result<()>
where
    H: HttpClient + 'static,
    S: KeyValueStore,
{
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = App {
        view,
        selected: 0,
        field: FormField::Title,
        input: Input::default(),
        fetching: false,
        logger_state: TuiWidgetState::new(),
        events: tx,
    };
    tracing::info!("Arrows move, '+' raises a price, 'a' adds a product, 'r' refreshes, 'q' quits");
    app.spawn_fetch();

    let res = run_app(&mut terminal, &mut app, &mut rx).await;
    app.view.unmount();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

async fn run_app<H, S>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App<'_, H, S>,
    rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> anyhow::Result<()>
where
    H: HttpClient + 'static,
    S: KeyValueStore,
{
    loop {
        while let Ok(event) = rx.try_recv() {
            app.apply(event);
        }
        if app.view.take_invalidation() {
            tracing::debug!("Catalog invalidated, refetching");
            app.spawn_fetch();
        }

        terminal.draw(|f| ui(f, app))?;

        if event::poll(TICK)?
            && let Event::Key(key) = event::read()?
            && matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat)
            && !app.handle_key(key)
        {
            return Ok(());
        }
    }
}

impl<H, S> App<'_, H, S>
where
    H: HttpClient + 'static,
    S: KeyValueStore,
{
    fn cards(&self) -> Vec<ProductCard> {
        match self.view.screen() {
            Screen::Grid(cards) => cards,
            Screen::Loading | Screen::Error(_) => Vec::new(),
        }
    }

    fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::Fetched(result) => {
                self.fetching = false;
                self.view.apply_fetch(result);
            }
            AppEvent::Updated { id, update, result } => {
                self.view.apply_update(id, &update, result);
            }
            AppEvent::Created { product, result } => {
                self.view.apply_created(product, result);
                if !self.view.form().is_open() {
                    self.field = FormField::Title;
                    self.input = Input::default();
                }
            }
        }
        let len = self.cards().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Returns `false` when the user asked to quit
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.view.form().is_open() {
            self.handle_form_key(key);
            return true;
        }

        let len = self.cards().len();
        let last = len.saturating_sub(1);
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Left | KeyCode::Char('h') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Right | KeyCode::Char('l') => self.selected = (self.selected + 1).min(last),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(COLUMNS)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + COLUMNS).min(last)
            }
            KeyCode::Char('+') => self.increase_selected_price(),
            KeyCode::Char('a') => {
                self.view.form_mut().open();
                self.focus(self.field);
            }
            KeyCode::Char('r') => self.view.api().invalidate(CacheTag::Products),
            KeyCode::PageUp => self.logger_state.transition(TuiWidgetEvent::PrevPageKey),
            KeyCode::PageDown => self.logger_state.transition(TuiWidgetEvent::NextPageKey),
            _ => {}
        }
        true
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        if self.view.form().is_submitting() {
            return;
        }
        match key.code {
            KeyCode::Tab => {
                self.commit_input();
                self.focus(self.field.next());
            }
            KeyCode::BackTab => {
                self.commit_input();
                self.focus(self.field.prev());
            }
            KeyCode::Enter => {
                self.commit_input();
                self.spawn_create();
            }
            KeyCode::Esc => {
                self.commit_input();
                self.view.form_mut().cancel();
            }
            _ => {
                self.input.handle_event(&Event::Key(key));
            }
        }
    }

    fn focus(&mut self, field: FormField) {
        self.field = field;
        self.input = Input::new(self.view.form().value(field).to_string());
    }

    fn commit_input(&mut self) {
        let value = self.input.value().to_string();
        self.view.form_mut().set(self.field, value);
    }

    fn increase_selected_price(&mut self) {
        let Some(card) = self.cards().into_iter().nth(self.selected) else {
            return;
        };
        let Some(id) = card.id else {
            tracing::warn!(title = %card.title, "Local product has no id yet");
            self.view
                .set_status(format!("{} is not saved remotely yet", card.title));
            return;
        };
        match self.view.price_increase(id) {
            Some(update) => self.spawn_update(id, update),
            None => self.view.reject_unknown(id),
        }
    }

    fn spawn_fetch(&mut self) {
        self.fetching = true;
        let api = Arc::clone(self.view.api());
        let cancel = self.view.cancellation();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = api.list_products() => result,
            };
            let _ = tx.send(AppEvent::Fetched(result));
        });
    }

    fn spawn_update(&mut self, id: u64, update: ProductUpdate) {
        let api = Arc::clone(self.view.api());
        let cancel = self.view.cancellation();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = api.replace_product(id, &update) => result,
            };
            let _ = tx.send(AppEvent::Updated { id, update, result });
        });
    }

    fn spawn_create(&mut self) {
        let Some(product) = self.view.form_mut().begin_submit() else {
            return;
        };
        let api = Arc::clone(self.view.api());
        let cancel = self.view.cancellation();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = api.create_product(&product) => result,
            };
            let _ = tx.send(AppEvent::Created { product, result });
        });
    }
}

fn ui<H, S>(f: &mut Frame, app: &App<'_, H, S>)
where
    H: HttpClient + 'static,
    S: KeyValueStore,
{
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),        // Header
            Constraint::Min(CARD_HEIGHT), // Grid
            Constraint::Length(3),        // Status
            Constraint::Length(8),        // Logs
        ])
        .split(f.area());

    let screen = app.view.screen();
    let count = match &screen {
        Screen::Grid(cards) => cards.len(),
        Screen::Loading | Screen::Error(_) => 0,
    };

    // Header
    let title = Paragraph::new(Line::from(vec![
        Span::raw(" Product List "),
        Span::styled(format!(" {count} products "), Style::default().fg(Color::Yellow)),
        Span::raw(" | "),
        if app.fetching {
            Span::styled(
                " Fetching... ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(" Idle ", Style::default().fg(Color::Green))
        },
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(title, chunks[0]);

    match &screen {
        Screen::Loading => {
            let loading = Paragraph::new("Loading products...")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(loading, chunks[1]);
        }
        Screen::Error(message) => {
            let error = Paragraph::new(format!("Error fetching products: {message}"))
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(error, chunks[1]);
        }
        Screen::Grid(cards) => draw_grid(f, chunks[1], cards, app.selected),
    }

    // Status
    let status = Paragraph::new(app.view.status().unwrap_or(
        "←↑→↓ move | + increase price | a add product | r refresh | q quit",
    ))
    .block(
        Block::default()
            .title(" Status ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(status, chunks[2]);

    // Logs
    let logs = TuiLoggerWidget::default()
        .block(
            Block::default()
                .title(" Logs ")
                .border_style(
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::DIM),
                )
                .borders(Borders::ALL),
        )
        .output_separator('|')
        .output_timestamp(Some("%H:%M:%S".to_string()))
        .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
        .output_target(false)
        .output_file(false)
        .output_line(false)
        .style(Style::default().fg(Color::White))
        .state(&app.logger_state);
    f.render_widget(logs, chunks[3]);

    if app.view.form().is_open() {
        draw_form(f, app);
    }
}

fn draw_grid(f: &mut Frame, area: Rect, cards: &[ProductCard], selected: usize) {
    if cards.is_empty() {
        let empty = Paragraph::new("No products")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(empty, area);
        return;
    }

    // Scroll so the selected row stays visible
    let visible_rows = usize::from((area.height / CARD_HEIGHT).max(1));
    let selected_row = selected / COLUMNS;
    let first_row = selected_row.saturating_sub(visible_rows - 1);

    for (offset, row) in cards.chunks(COLUMNS).skip(first_row).take(visible_rows).enumerate() {
        let row_area = Rect {
            x: area.x,
            y: area.y + offset as u16 * CARD_HEIGHT,
            width: area.width,
            height: CARD_HEIGHT,
        }
        .intersection(area);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, COLUMNS as u32); COLUMNS])
            .split(row_area);

        for (column, card) in row.iter().enumerate() {
            let index = (first_row + offset) * COLUMNS + column;
            f.render_widget(card_widget(card, index == selected), columns[column]);
        }
    }
}

fn card_widget(card: &ProductCard, selected: bool) -> Paragraph<'_> {
    let border = if selected {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White).add_modifier(Modifier::DIM)
    };
    let id = card
        .id
        .map_or_else(|| " local ".to_string(), |id| format!(" #{id} "));

    Paragraph::new(vec![
        Line::from(Span::styled(
            card.title.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            card.category.as_str(),
            Style::default().fg(Color::Cyan),
        )),
        Line::from(Span::styled(
            card.price.as_str(),
            Style::default().fg(Color::Green),
        )),
        Line::from(format!("Rating: {}", card.rating)),
        Line::from(Span::styled(
            card.image.as_str(),
            Style::default().add_modifier(Modifier::DIM),
        )),
    ])
    .block(
        Block::default()
            .title(id)
            .borders(Borders::ALL)
            .border_style(border),
    )
}

fn draw_form<H, S>(f: &mut Frame, app: &App<'_, H, S>)
where
    H: HttpClient + 'static,
    S: KeyValueStore,
{
    let form = app.view.form();
    let height = FormField::ALL.len() as u16 * 3 + 4;
    let area = centered_rect(60, height, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Add Product ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut constraints = vec![Constraint::Length(1)];
    constraints.extend(FormField::ALL.iter().map(|_| Constraint::Length(3)));
    constraints.push(Constraint::Length(1));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    if let Some(error) = form.error() {
        let error = Paragraph::new(error.to_string()).style(Style::default().fg(Color::Red));
        f.render_widget(error, rows[0]);
    }

    for (i, field) in FormField::ALL.iter().copied().enumerate() {
        let row = rows[i + 1];
        let focused = field == app.field;
        let value = if focused {
            app.input.value()
        } else {
            form.value(field)
        };
        let (text, style) = if value.is_empty() && !focused {
            (field.placeholder(), Style::default().add_modifier(Modifier::DIM))
        } else {
            (value, Style::default())
        };
        let border = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };

        let width = row.width.saturating_sub(2) as usize;
        let scroll = if focused { app.input.visual_scroll(width) } else { 0 };
        let input = Paragraph::new(text)
            .style(style)
            .scroll((0, scroll as u16))
            .block(
                Block::default()
                    .title(field.placeholder())
                    .borders(Borders::ALL)
                    .border_style(border),
            );
        f.render_widget(input, row);

        if focused && !form.is_submitting() {
            let cursor = app.input.visual_cursor().max(scroll) - scroll;
            f.set_cursor_position((row.x + 1 + cursor as u16, row.y + 1));
        }
    }

    let footer = if form.is_submitting() {
        Span::styled("Adding...", Style::default().fg(Color::Yellow))
    } else {
        Span::raw("Tab next field | Enter Add Product | Esc cancel")
    };
    f.render_widget(Paragraph::new(Line::from(footer)), rows[FormField::ALL.len() + 1]);
}

/// A `percent_x` wide, `height` tall rect centered in `area`
fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height.min(area.height)),
            Constraint::Fill(1),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::{MirrorStore, PRODUCTS_KEY, ReconcilePolicy};
    use crate::store::MemoryStore;
    use catalog_client::{CatalogApi, InMemoryHttpClient};
    use crossterm::event::KeyModifiers;
    use shared::Rating;

    type TestView = CatalogView<InMemoryHttpClient, Arc<MemoryStore>>;

    fn product(id: Option<u64>, title: &str) -> Product {
        Product {
            id,
            title: title.to_string(),
            price: 10.0,
            description: "desc".to_string(),
            category: "cat".to_string(),
            image: "https://img.example/a.png".to_string(),
            rating: Rating::new(4.0, 2),
        }
    }

    fn view_with(stored: &[Product], policy: ReconcilePolicy) -> TestView {
        let store = Arc::new(MemoryStore::new());
        store
            .set(PRODUCTS_KEY, &serde_json::to_string(stored).unwrap())
            .unwrap();
        let api = Arc::new(CatalogApi::new(InMemoryHttpClient::new()));
        CatalogView::mount(api, MirrorStore::load(store).with_policy(policy))
    }

    fn app(
        view: &mut TestView,
    ) -> (
        App<'_, InMemoryHttpClient, Arc<MemoryStore>>,
        mpsc::UnboundedReceiver<AppEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App {
            view,
            selected: 0,
            field: FormField::Title,
            input: Input::default(),
            fetching: false,
            logger_state: TuiWidgetState::new(),
            events: tx,
        };
        (app, rx)
    }

    fn press(app: &mut App<'_, InMemoryHttpClient, Arc<MemoryStore>>, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App<'_, InMemoryHttpClient, Arc<MemoryStore>>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[tokio::test]
    async fn test_selection_moves_and_clamps() {
        let mut view = view_with(&[], ReconcilePolicy::Replace);
        let (mut app, _rx) = app(&mut view);
        let products: Vec<_> = (1..=4).map(|id| product(Some(id), "P")).collect();
        app.apply(AppEvent::Fetched(Ok(products)));

        for _ in 0..5 {
            press(&mut app, KeyCode::Right);
        }
        assert_eq!(app.selected, 3);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.selected, 0);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected, 3);

        // A shorter snapshot pulls the selection back onto the grid
        app.apply(AppEvent::Fetched(Ok(vec![product(Some(1), "P"), product(Some(2), "P")])));
        assert_eq!(app.selected, 1);
        assert!(!press(&mut app, KeyCode::Char('q')));
    }

    #[tokio::test]
    async fn test_local_card_price_is_not_sent() {
        let mut view = view_with(&[product(None, "Local")], ReconcilePolicy::KeepPending);
        let (mut app, _rx) = app(&mut view);
        app.apply(AppEvent::Fetched(Ok(Vec::new())));
        assert_eq!(app.cards().len(), 1);

        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.view.status(), Some("Local is not saved remotely yet"));
        assert_eq!(app.view.api().http().request_count(), 0);
    }

    #[tokio::test]
    async fn test_form_keys_commit_focused_field() {
        let mut view = view_with(&[], ReconcilePolicy::Replace);
        let (mut app, _rx) = app(&mut view);

        press(&mut app, KeyCode::Char('a'));
        assert!(app.view.form().is_open());
        type_text(&mut app, "lamp");
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.view.form().value(FormField::Title), "lamp");
        assert_eq!(app.field, FormField::Price);

        type_text(&mut app, "25");
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.view.form().value(FormField::Price), "25");
        assert_eq!(app.input.value(), "lamp");

        // Esc closes but keeps what was typed
        type_text(&mut app, "s");
        press(&mut app, KeyCode::Esc);
        assert!(!app.view.form().is_open());
        assert_eq!(app.view.form().value(FormField::Title), "lamps");

        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.input.value(), "lamps");
    }

    #[tokio::test]
    async fn test_enter_submits_and_resets_form() {
        let mut view = view_with(&[], ReconcilePolicy::Replace);
        let (mut app, mut rx) = app(&mut view);

        press(&mut app, KeyCode::Char('a'));
        for value in ["lamp", "25", "desk lamp", "home", "img", "4"] {
            type_text(&mut app, value);
            press(&mut app, KeyCode::Tab);
        }
        // Back on the rating field, which Enter commits
        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::Enter);
        assert!(app.view.form().is_submitting());

        let event = rx.recv().await.unwrap();
        app.apply(event);

        assert!(!app.view.form().is_open());
        assert_eq!(app.field, FormField::Title);
        assert_eq!(app.input.value(), "");
        let added = &app.view.mirror().products()[0];
        assert_eq!(added.id, None);
        assert_eq!(added.title, "lamp");
        assert_eq!(added.rating, Rating::new(4.0, 0));
    }

    #[test]
    fn test_centered_rect_fits_area() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = centered_rect(60, 22, area);
        assert_eq!(rect.width, 60);
        assert_eq!(rect.height, 22);
        assert_eq!(rect.x, 20);
        assert_eq!(rect.y, 9);
    }

    #[test]
    fn test_centered_rect_clamps_height() {
        let area = Rect::new(0, 0, 80, 10);
        let rect = centered_rect(50, 22, area);
        assert_eq!(rect.height, 10);
    }
}
