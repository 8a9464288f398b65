use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::layout::{Alignment, Constraint, Direction as LayoutDirection, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
    Tabs, Wrap,
};
use ratatui::{Frame, Terminal};

use bd_core::{
    Bank, BankId, FieldKey, MortgageProgram, ProgramCategory, ProgramId, PREDEFINED_BANKS,
};
use bd_store::{
    Action, AppState, BankEdit, BankSelector, Direction, EditorSession, EditorTab,
    NotificationKind, ProgramEdit,
};
use bd_utils::{format_percent, non_empty, parse_decimal, parse_optional_decimal, parse_whole};

const TICK_RATE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    None,
    AddMenu,
    Editor,
    EditField,
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeneralField {
    Name,
    Logo,
    Description,
    AutoRates,
    Active,
}

impl GeneralField {
    const ALL: [GeneralField; 5] = [
        GeneralField::Name,
        GeneralField::Logo,
        GeneralField::Description,
        GeneralField::AutoRates,
        GeneralField::Active,
    ];

    fn label(self) -> &'static str {
        match self {
            GeneralField::Name => "Bank name *",
            GeneralField::Logo => "Logo URL",
            GeneralField::Description => "Description",
            GeneralField::AutoRates => "Bank auto-rates",
            GeneralField::Active => "Bank active",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgramField {
    Name,
    AutoRates,
    Rate,
    DownPayment,
    PskMin,
    PskMax,
    MinTerm,
    MaxTerm,
    Conditions,
    Special,
}

impl ProgramField {
    const ALL: [ProgramField; 10] = [
        ProgramField::Name,
        ProgramField::AutoRates,
        ProgramField::Rate,
        ProgramField::DownPayment,
        ProgramField::PskMin,
        ProgramField::PskMax,
        ProgramField::MinTerm,
        ProgramField::MaxTerm,
        ProgramField::Conditions,
        ProgramField::Special,
    ];

    fn label(self) -> &'static str {
        match self {
            ProgramField::Name => "Program *",
            ProgramField::AutoRates => "Auto-rates",
            ProgramField::Rate => "Rate, %",
            ProgramField::DownPayment => "Min down payment, %",
            ProgramField::PskMin => "Full cost from, %",
            ProgramField::PskMax => "Full cost to, %",
            ProgramField::MinTerm => "Min term, years",
            ProgramField::MaxTerm => "Max term, years",
            ProgramField::Conditions => "Conditions",
            ProgramField::Special => "Special conditions",
        }
    }

    /// Fields locked while the program is auto-rated.
    fn is_derived(self) -> bool {
        matches!(
            self,
            ProgramField::Rate
                | ProgramField::DownPayment
                | ProgramField::PskMin
                | ProgramField::PskMax
                | ProgramField::MinTerm
                | ProgramField::MaxTerm
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EditorField {
    General(GeneralField),
    Program(ProgramId, ProgramField),
}

#[derive(Debug, Default, Clone)]
struct TextInput {
    content: String,
    cursor: usize,
}

impl TextInput {
    fn from(content: String) -> Self {
        let cursor = content.chars().count();
        Self { content, cursor }
    }

    fn byte_index(&self) -> usize {
        self.content
            .char_indices()
            .nth(self.cursor)
            .map_or(self.content.len(), |(index, _)| index)
    }

    fn insert(&mut self, c: char) {
        let index = self.byte_index();
        self.content.insert(index, c);
        self.cursor += 1;
    }

    fn delete_back(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let index = self.byte_index();
            self.content.remove(index);
        }
    }

    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        if self.cursor < self.content.chars().count() {
            self.cursor += 1;
        }
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.content.chars().count();
    }

    fn reset(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }
}

#[derive(Debug)]
struct App {
    state: AppState,
    table_state: TableState,
    menu_state: ListState,
    input_mode: InputMode,
    input: TextInput,
    field_cursor: usize,
    editing: Option<EditorField>,
    status: Option<String>,
    show_help: bool,
}

impl App {
    fn new(state: AppState) -> Self {
        let mut table_state = TableState::default();
        if !state.visible_banks().is_empty() {
            table_state.select(Some(0));
        }
        Self {
            state,
            table_state,
            menu_state: ListState::default(),
            input_mode: InputMode::None,
            input: TextInput::default(),
            field_cursor: 0,
            editing: None,
            status: None,
            show_help: false,
        }
    }

    fn dispatch(&mut self, action: Action) {
        self.state.reduce(action, Instant::now());
    }

    fn current_bank(&self) -> Option<&Bank> {
        let index = self.table_state.selected()?;
        self.state.visible_banks().get(index).copied()
    }

    fn current_bank_id(&self) -> Option<BankId> {
        self.current_bank().map(|bank| bank.id.clone())
    }

    /// Keep the table selection inside the filtered view.
    fn clamp_selection(&mut self) {
        let len = self.state.visible_banks().len();
        match self.table_state.selected() {
            _ if len == 0 => self.table_state.select(None),
            Some(index) if index >= len => self.table_state.select(Some(len - 1)),
            None => self.table_state.select(Some(0)),
            Some(_) => {}
        }
    }

    fn select_bank(&mut self, id: &BankId) {
        let position = self
            .state
            .visible_banks()
            .iter()
            .position(|bank| &bank.id == id);
        if let Some(position) = position {
            self.table_state.select(Some(position));
        }
    }

    fn editor_fields(&self) -> Vec<EditorField> {
        self.state.editor().map(fields_for).unwrap_or_default()
    }

    fn current_field(&self) -> Option<EditorField> {
        self.editor_fields().get(self.field_cursor).cloned()
    }

    fn select_next(state: &mut ListState, len: usize) {
        let i = match state.selected() {
            Some(i) => {
                if i + 1 >= len { 0 } else { i + 1 }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    fn select_prev(state: &mut ListState, len: usize) {
        let i = match state.selected() {
            Some(i) => {
                if i == 0 { len.saturating_sub(1) } else { i - 1 }
            }
            None => 0,
        };
        state.select(Some(i));
    }
}

fn fields_for(session: &EditorSession) -> Vec<EditorField> {
    match session.tab() {
        EditorTab::General => GeneralField::ALL.into_iter().map(EditorField::General).collect(),
        EditorTab::Programs => session
            .draft()
            .programs
            .iter()
            .flat_map(|program| {
                ProgramField::ALL
                    .into_iter()
                    .map(|field| EditorField::Program(program.id.clone(), field))
            })
            .collect(),
    }
}

/// Run the interactive bank settings screen until the user quits.
pub fn run(state: AppState) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(state);
    let result = event_loop(&mut terminal, &mut app);

    restore_terminal(terminal)?;
    result
}

fn event_loop(
    terminal: &mut Terminal<ratatui::backend::CrosstermBackend<Stdout>>,
    app: &mut App,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render_app(frame, app))?;

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(app, key) {
                    break;
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.dispatch(Action::Tick);
            last_tick = Instant::now();
        }
    }
    tracing::debug!("leaving bank settings screen");
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    match app.input_mode {
        InputMode::AddMenu => {
            handle_add_menu(app, key);
            return false;
        }
        InputMode::Editor => {
            handle_editor_key(app, key);
            return false;
        }
        InputMode::EditField => {
            handle_field_input(app, key);
            return false;
        }
        InputMode::Confirm => {
            handle_confirm_input(app, key);
            return false;
        }
        InputMode::None => {}
    }

    if app.show_help {
        app.show_help = false;
        return false;
    }

    let len = app.state.visible_banks().len();
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('j') | KeyCode::Down => move_table(&mut app.table_state, len, 1),
        KeyCode::Char('k') | KeyCode::Up => move_table(&mut app.table_state, len, -1),
        KeyCode::Home | KeyCode::Char('g') => {
            if len > 0 {
                app.table_state.select(Some(0));
            }
        }
        KeyCode::End | KeyCode::Char('G') => {
            if len > 0 {
                app.table_state.select(Some(len - 1));
            }
        }
        KeyCode::Char('a') => {
            app.menu_state.select(Some(0));
            app.input_mode = InputMode::AddMenu;
        }
        KeyCode::Enter | KeyCode::Char('e') => open_editor(app, EditorTab::General),
        KeyCode::Char('p') => open_editor(app, EditorTab::Programs),
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(id) = app.current_bank_id() {
                app.dispatch(Action::RequestDelete(id));
                if app.state.deletion().is_open() {
                    app.input_mode = InputMode::Confirm;
                }
            }
        }
        KeyCode::Char(' ') | KeyCode::Char('t') => {
            if let Some(bank) = app.current_bank() {
                let action = Action::SetActive {
                    id: bank.id.clone(),
                    active: !bank.is_active,
                };
                app.dispatch(action);
                app.clamp_selection();
            }
        }
        KeyCode::Char('K') => reorder_current(app, Direction::Up),
        KeyCode::Char('J') => reorder_current(app, Direction::Down),
        KeyCode::Char('b') => {
            let next = next_bank_selector(app.state.store().banks(), &app.state.filters().bank);
            app.dispatch(Action::SelectBank(next));
            app.clamp_selection();
        }
        KeyCode::Char('s') => {
            let next = app.state.filters().status.next();
            app.dispatch(Action::SetStatusFilter(next));
            app.clamp_selection();
        }
        KeyCode::Char('f') => {
            let next = app.state.filters().programs.next();
            app.dispatch(Action::SetProgramFilter(next));
            app.clamp_selection();
        }
        KeyCode::Char('c') | KeyCode::Esc => {
            app.dispatch(Action::ResetFilters);
            app.clamp_selection();
        }
        KeyCode::Char('A') => {
            let enabled = !app.state.apply_to_all_projects();
            app.dispatch(Action::SetApplyToAll(enabled));
        }
        KeyCode::Char('x') => {
            let oldest = app.state.notifications().visible(Instant::now()).next().map(|n| n.id);
            if let Some(id) = oldest {
                app.dispatch(Action::Dismiss(id));
            }
        }
        _ => {}
    }
    false
}

fn move_table(state: &mut TableState, len: usize, step: isize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let current = state.selected().unwrap_or(0);
    let next = if step < 0 {
        if current == 0 { len - 1 } else { current - 1 }
    } else if current + 1 >= len {
        0
    } else {
        current + 1
    };
    state.select(Some(next));
}

fn next_bank_selector(banks: &[Bank], current: &BankSelector) -> BankSelector {
    let next_index = match current {
        BankSelector::All => 0,
        BankSelector::Bank(id) => match banks.iter().position(|bank| &bank.id == id) {
            Some(index) => index + 1,
            None => banks.len(),
        },
    };
    banks
        .get(next_index)
        .map_or(BankSelector::All, |bank| BankSelector::Bank(bank.id.clone()))
}

fn reorder_current(app: &mut App, direction: Direction) {
    if let Some(id) = app.current_bank_id() {
        app.dispatch(Action::Reorder {
            id: id.clone(),
            direction,
        });
        app.select_bank(&id);
    }
}

fn open_editor(app: &mut App, tab: EditorTab) {
    if let Some(id) = app.current_bank_id() {
        app.dispatch(Action::EditBank { id, tab });
        enter_editor(app);
    }
}

fn enter_editor(app: &mut App) {
    if app.state.editor().is_some() {
        app.input_mode = InputMode::Editor;
        app.field_cursor = 0;
        app.status = None;
    }
}

fn add_menu_len() -> usize {
    PREDEFINED_BANKS.len() + 1
}

fn handle_add_menu(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
            app.input_mode = InputMode::None;
        }
        KeyCode::Char('j') | KeyCode::Down => App::select_next(&mut app.menu_state, add_menu_len()),
        KeyCode::Char('k') | KeyCode::Up => App::select_prev(&mut app.menu_state, add_menu_len()),
        KeyCode::Enter => {
            let index = app.menu_state.selected().unwrap_or(0);
            let template = PREDEFINED_BANKS.get(index).copied();
            app.dispatch(Action::NewBank(template));
            enter_editor(app);
        }
        _ => {}
    }
}

fn handle_editor_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
        save_editor(app);
        return;
    }

    let len = app.editor_fields().len();
    match key.code {
        KeyCode::Esc => {
            app.dispatch(Action::CloseEditor);
            app.input_mode = InputMode::None;
            app.status = None;
        }
        KeyCode::Tab | KeyCode::BackTab => {
            if let Some(tab) = app.state.editor().map(|editor| editor.tab().toggle()) {
                app.dispatch(Action::SelectTab(tab));
                app.field_cursor = 0;
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if len > 0 {
                app.field_cursor = (app.field_cursor + 1) % len;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if len > 0 {
                app.field_cursor = if app.field_cursor == 0 { len - 1 } else { app.field_cursor - 1 };
            }
        }
        KeyCode::Char('n') => {
            app.dispatch(Action::SelectTab(EditorTab::Programs));
            app.dispatch(Action::AddProgram);
            let len = app.editor_fields().len();
            app.field_cursor = len.saturating_sub(ProgramField::ALL.len());
        }
        KeyCode::Char('x') => {
            if let Some(EditorField::Program(id, _)) = app.current_field() {
                app.dispatch(Action::RemoveProgram(id));
                let len = app.editor_fields().len();
                app.field_cursor = app.field_cursor.min(len.saturating_sub(1));
            }
        }
        KeyCode::Char('S') => save_editor(app),
        KeyCode::Enter | KeyCode::Char(' ') => activate_field(app),
        _ => {}
    }
}

fn save_editor(app: &mut App) {
    let saved_id = app.state.editor().map(|editor| editor.draft().id.clone());
    app.dispatch(Action::Save);
    if app.state.editor().is_none() {
        app.input_mode = InputMode::None;
        app.status = None;
        app.clamp_selection();
        if let Some(id) = saved_id {
            app.select_bank(&id);
        }
    } else {
        app.status = Some("Fix the highlighted fields before saving".into());
    }
}

fn activate_field(app: &mut App) {
    let Some(field) = app.current_field() else {
        return;
    };
    let Some(draft) = app.state.editor().map(EditorSession::draft) else {
        return;
    };

    match &field {
        EditorField::General(GeneralField::AutoRates) => {
            let enabled = !draft.auto_rates;
            app.dispatch(Action::EditGeneral(BankEdit::AutoRates(enabled)));
        }
        EditorField::General(GeneralField::Active) => {
            let active = !draft.is_active;
            app.dispatch(Action::EditGeneral(BankEdit::Active(active)));
        }
        EditorField::General(general) => {
            let current = match general {
                GeneralField::Name => draft.name.clone(),
                GeneralField::Logo => draft.logo.clone().unwrap_or_default(),
                _ => draft.description.clone().unwrap_or_default(),
            };
            begin_field_edit(app, field.clone(), current);
        }
        EditorField::Program(id, program_field) => {
            let Some(program) = draft.program(id) else {
                return;
            };
            if program.auto_rates && program_field.is_derived() {
                app.status = Some("Managed by auto-rates; switch them off to edit".into());
                return;
            }
            let edit = match program_field {
                ProgramField::Name => {
                    let next = ProgramCategory::from_label(&program.name)
                        .map_or(MortgageProgram::DEFAULT_CATEGORY, ProgramCategory::next);
                    Some(ProgramEdit::Name(next.label().to_string()))
                }
                ProgramField::AutoRates => Some(ProgramEdit::AutoRates(!program.auto_rates)),
                ProgramField::Special => {
                    Some(ProgramEdit::SpecialConditions(!program.special_conditions))
                }
                _ => None,
            };
            match edit {
                Some(edit) => app.dispatch(Action::EditProgram(id.clone(), edit)),
                None => {
                    let current = program_value(program, *program_field);
                    begin_field_edit(app, field.clone(), current);
                }
            }
        }
    }
}

fn begin_field_edit(app: &mut App, field: EditorField, current: String) {
    app.editing = Some(field);
    app.input = TextInput::from(current);
    app.input_mode = InputMode::EditField;
    app.status = None;
}

fn handle_field_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.editing = None;
            app.input.reset();
            app.input_mode = InputMode::Editor;
            app.status = None;
        }
        KeyCode::Enter => commit_field_edit(app),
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                match c {
                    'a' => app.input.move_home(),
                    'e' => app.input.move_end(),
                    _ => {}
                }
            } else {
                app.input.insert(c);
            }
        }
        KeyCode::Backspace => app.input.delete_back(),
        KeyCode::Left => app.input.move_left(),
        KeyCode::Right => app.input.move_right(),
        KeyCode::Home => app.input.move_home(),
        KeyCode::End => app.input.move_end(),
        _ => {}
    }
}

fn commit_field_edit(app: &mut App) {
    let Some(field) = app.editing.clone() else {
        app.input_mode = InputMode::Editor;
        return;
    };
    let text = app.input.content.clone();
    let action = match field {
        EditorField::General(GeneralField::Name) => Ok(Action::EditGeneral(BankEdit::Name(text))),
        EditorField::General(GeneralField::Logo) => {
            Ok(Action::EditGeneral(BankEdit::Logo(non_empty(&text))))
        }
        EditorField::General(_) => Ok(Action::EditGeneral(BankEdit::Description(non_empty(&text)))),
        EditorField::Program(id, program_field) => {
            parse_program_edit(program_field, &text).map(|edit| Action::EditProgram(id, edit))
        }
    };

    match action {
        Ok(action) => {
            app.dispatch(action);
            app.editing = None;
            app.input.reset();
            app.input_mode = InputMode::Editor;
            app.status = None;
        }
        Err(err) => {
            app.status = Some(err.to_string());
        }
    }
}

fn parse_program_edit(field: ProgramField, text: &str) -> bd_utils::UtilsResult<ProgramEdit> {
    Ok(match field {
        ProgramField::Rate => ProgramEdit::Rate(parse_decimal(text)?),
        ProgramField::DownPayment => ProgramEdit::MinDownPayment(parse_decimal(text)?),
        ProgramField::PskMin => ProgramEdit::PskMin(parse_optional_decimal(text)?),
        ProgramField::PskMax => ProgramEdit::PskMax(parse_optional_decimal(text)?),
        ProgramField::MinTerm => ProgramEdit::MinTerm(parse_whole(text)?),
        ProgramField::MaxTerm => ProgramEdit::MaxTerm(parse_whole(text)?),
        ProgramField::Conditions => ProgramEdit::Conditions(non_empty(text)),
        ProgramField::Name => ProgramEdit::Name(text.trim().to_string()),
        ProgramField::AutoRates | ProgramField::Special => {
            return Err(bd_utils::UtilsError::Parse("toggle fields take no text".into()))
        }
    })
}

fn handle_confirm_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.dispatch(Action::ConfirmDelete);
            app.input_mode = InputMode::None;
            app.clamp_selection();
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
            app.dispatch(Action::CancelDelete);
            app.input_mode = InputMode::None;
        }
        _ => {}
    }
}

/// One-line summary of a program as shown in the bank table.
pub fn program_summary(program: &MortgageProgram) -> String {
    let mut line = format!(
        "{}: {} · DP {} · {}-{} yrs",
        program.name,
        format_percent(program.rate),
        format_percent(program.min_down_payment),
        program.min_term,
        program.max_term
    );
    if let (Some(min), Some(max)) = (program.psk_min, program.psk_max) {
        line.push_str(&format!(" · PSK {}-{}", format_percent(min), format_percent(max)));
    }
    if program.auto_rates {
        line.push_str(" (auto)");
    }
    line
}

fn program_value(program: &MortgageProgram, field: ProgramField) -> String {
    let optional = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
    match field {
        ProgramField::Name => program.name.clone(),
        ProgramField::AutoRates => {
            if program.auto_rates {
                "on, synced automatically".into()
            } else {
                "off, manual rates".into()
            }
        }
        ProgramField::Rate => program.rate.to_string(),
        ProgramField::DownPayment => program.min_down_payment.to_string(),
        ProgramField::PskMin => optional(program.psk_min),
        ProgramField::PskMax => optional(program.psk_max),
        ProgramField::MinTerm => program.min_term.to_string(),
        ProgramField::MaxTerm => program.max_term.to_string(),
        ProgramField::Conditions => program.conditions.clone().unwrap_or_default(),
        ProgramField::Special => yes_no(program.special_conditions).into(),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn field_error_key(draft: &Bank, field: &EditorField) -> Option<FieldKey> {
    match field {
        EditorField::General(GeneralField::Name) => Some(FieldKey::BankName),
        EditorField::General(_) => None,
        EditorField::Program(id, program_field) => {
            let index = draft.programs.iter().position(|program| &program.id == id)?;
            match program_field {
                ProgramField::Name => Some(FieldKey::ProgramName(index)),
                ProgramField::Rate => Some(FieldKey::ProgramRate(index)),
                ProgramField::DownPayment => Some(FieldKey::ProgramDownPayment(index)),
                _ => None,
            }
        }
    }
}

fn render_app(frame: &mut Frame, app: &App) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(size);

    render_filter_bar(frame, chunks[0], app);
    render_banks(frame, chunks[1], app);
    render_guide_bar(frame, chunks[2], app);

    match app.input_mode {
        InputMode::AddMenu => render_add_menu(frame, size, app),
        InputMode::Editor => render_editor(frame, size, app),
        InputMode::EditField => {
            render_editor(frame, size, app);
            render_input_popup(frame, size, app);
        }
        InputMode::Confirm => render_confirm_popup(frame, size, app),
        InputMode::None => {}
    }

    if app.show_help {
        render_help_popup(frame, size);
    }

    render_toasts(frame, size, app);
}

fn render_filter_bar(frame: &mut Frame, area: Rect, app: &App) {
    let filters = app.state.filters();
    let bank_label = match &filters.bank {
        BankSelector::All => "All banks".to_string(),
        BankSelector::Bank(id) => app
            .state
            .store()
            .get(id)
            .map_or_else(|| id.to_string(), |bank| bank.name.clone()),
    };
    let highlight = Style::default().fg(Color::Yellow);
    let line = Line::from(vec![
        Span::raw("Bank: "),
        Span::styled(bank_label, highlight),
        Span::raw("  │  Status: "),
        Span::styled(filters.status.label(), highlight),
        Span::raw("  │  Programs: "),
        Span::styled(filters.programs.label(), highlight),
        Span::raw("  │  Apply to all projects: "),
        Span::styled(
            if app.state.apply_to_all_projects() { "on" } else { "off" },
            highlight,
        ),
    ]);
    let bar = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title("BankDesk · Partner banks and mortgage programs"),
    );
    frame.render_widget(bar, area);
}

fn render_banks(frame: &mut Frame, area: Rect, app: &App) {
    let visible = app.state.visible_banks();
    if visible.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "No banks found",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from("Add a bank with [a] or clear the filters with [c]."),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Banks"));
        frame.render_widget(empty, area);
        return;
    }

    let chunks = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(area);

    let rows = visible.iter().enumerate().map(|(index, bank)| {
        let mut name = bank.name.clone();
        if bank.auto_rates {
            name.push_str(" (auto)");
        }
        let programs = match bank.programs.len() {
            0 => "No programs".to_string(),
            1 => "1 program".to_string(),
            n => format!("{n} programs"),
        };
        let (status, color) = if bank.is_active {
            ("Active", Color::Green)
        } else {
            ("Inactive", Color::DarkGray)
        };
        Row::new(vec![
            Cell::from(format!("{}", index + 1)),
            Cell::from(name),
            Cell::from(programs),
            Cell::from(status).style(Style::default().fg(color)),
        ])
    });
    let widths = [
        Constraint::Length(4),
        Constraint::Percentage(45),
        Constraint::Percentage(30),
        Constraint::Length(10),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["#", "Bank", "Programs", "Status"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Banks ({}/{})", visible.len(), app.state.store().len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(table, chunks[0], &mut app.table_state.clone());

    let detail = match app.current_bank() {
        Some(bank) => {
            let mut lines = vec![Line::from(Span::styled(
                bank.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ))];
            if let Some(description) = &bank.description {
                lines.push(Line::from(description.clone()));
            }
            if let Some(logo) = &bank.logo {
                lines.push(Line::from(Span::styled(
                    format!("Logo: {logo}"),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            lines.push(Line::from(""));
            if bank.programs.is_empty() {
                lines.push(Line::from(Span::styled(
                    "No active programs. Press [p] to add one.",
                    Style::default().fg(Color::Yellow),
                )));
            }
            for program in &bank.programs {
                lines.push(Line::from(program_summary(program)));
                if let Some(conditions) = &program.conditions {
                    lines.push(Line::from(Span::styled(
                        format!("  {conditions}"),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
            lines
        }
        None => vec![Line::from("No bank selected")],
    };
    let detail = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title("Programs"))
        .wrap(Wrap { trim: true });
    frame.render_widget(detail, chunks[1]);
}

fn render_add_menu(frame: &mut Frame, area: Rect, app: &App) {
    let popup_area = centered_rect(40, 60, area);
    frame.render_widget(Clear, popup_area);
    let mut items: Vec<ListItem> = PREDEFINED_BANKS
        .iter()
        .map(|template| ListItem::new(template.name))
        .collect();
    items.push(ListItem::new("Other bank..."));
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Choose a bank"))
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, popup_area, &mut app.menu_state.clone());
}

fn render_editor(frame: &mut Frame, area: Rect, app: &App) {
    let Some(session) = app.state.editor() else {
        return;
    };
    let draft = session.draft();
    let popup_area = centered_rect(80, 80, area);
    frame.render_widget(Clear, popup_area);

    let title = if session.is_new() { "Add bank" } else { "Edit bank" };
    let outer = Block::default().borders(Borders::ALL).title(title);
    let inner = outer.inner(popup_area);
    frame.render_widget(outer, popup_area);

    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(inner);

    let tabs = Tabs::new(vec![
        Line::from("General"),
        Line::from(format!("Programs ({})", draft.programs.len())),
    ])
    .select(match session.tab() {
        EditorTab::General => 0,
        EditorTab::Programs => 1,
    })
    .block(Block::default().borders(Borders::BOTTOM))
    .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, chunks[0]);

    let fields = fields_for(session);
    if fields.is_empty() {
        let empty = Paragraph::new("No programs yet. Press [n] to add the first one.")
            .alignment(Alignment::Center);
        frame.render_widget(empty, chunks[1]);
    } else {
        let items = fields
            .iter()
            .map(|field| editor_line(draft, session, field))
            .map(ListItem::new)
            .collect::<Vec<_>>();
        let mut list_state = ListState::default();
        list_state.select(Some(app.field_cursor.min(fields.len() - 1)));
        let list = List::new(items).highlight_style(Style::default().bg(Color::DarkGray));
        frame.render_stateful_widget(list, chunks[1], &mut list_state);
    }

    let footer = match &app.status {
        Some(status) => Line::from(Span::styled(status.clone(), Style::default().fg(Color::Red))),
        None => Line::from(Span::styled(
            "Ctrl-s save · Esc cancel · Tab switch tab · n add program · x remove program",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(footer), chunks[2]);
}

fn editor_line<'a>(draft: &'a Bank, session: &'a EditorSession, field: &EditorField) -> Line<'a> {
    let (label, value, locked) = match field {
        EditorField::General(general) => {
            let value = match general {
                GeneralField::Name => draft.name.clone(),
                GeneralField::Logo => draft.logo.clone().unwrap_or_default(),
                GeneralField::Description => draft.description.clone().unwrap_or_default(),
                GeneralField::AutoRates => yes_no(draft.auto_rates).to_string(),
                GeneralField::Active => yes_no(draft.is_active).to_string(),
            };
            (general.label().to_string(), value, false)
        }
        EditorField::Program(id, program_field) => {
            let position = draft.programs.iter().position(|program| &program.id == id);
            match (position, draft.program(id)) {
                (Some(index), Some(program)) => (
                    format!("#{} {}", index + 1, program_field.label()),
                    program_value(program, *program_field),
                    program.auto_rates && program_field.is_derived(),
                ),
                _ => (program_field.label().to_string(), String::new(), false),
            }
        }
    };

    let value_style = if locked {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let mut spans = vec![
        Span::styled(format!("{label:<26}"), Style::default().fg(Color::Cyan)),
        Span::styled(value, value_style),
    ];
    if let Some(message) = field_error_key(draft, field).and_then(|key| session.errors().get(key)) {
        spans.push(Span::styled(
            format!("  {message}"),
            Style::default().fg(Color::Red),
        ));
    }
    Line::from(spans)
}

fn render_input_popup(frame: &mut Frame, area: Rect, app: &App) {
    let popup_area = centered_rect(60, 20, area);
    frame.render_widget(Clear, popup_area);
    let title = match &app.editing {
        Some(EditorField::General(field)) => field.label(),
        Some(EditorField::Program(_, field)) => field.label(),
        None => "Edit",
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let input_widget = Paragraph::new(app.input.content.as_str())
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(input_widget, popup_area);

    let cursor = u16::try_from(app.input.cursor).unwrap_or(u16::MAX);
    let cx = popup_area.x + 1 + cursor.min(popup_area.width.saturating_sub(2));
    frame.set_cursor(cx, popup_area.y + 1);
}

fn render_confirm_popup(frame: &mut Frame, area: Rect, app: &App) {
    let Some(pending) = app.state.deletion().pending() else {
        return;
    };
    let popup_area = centered_rect(50, 30, area);
    frame.render_widget(Clear, popup_area);
    let lines = vec![
        Line::from(pending.prompt()),
        Line::from(""),
        Line::from(Span::styled(
            "[y] Delete    [n] Cancel",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    let popup = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Delete bank?")
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(popup, popup_area);
}

fn render_toasts(frame: &mut Frame, area: Rect, app: &App) {
    let width = area.width.min(48);
    let mut y = area.y + 1;
    for notification in app.state.notifications().visible(Instant::now()) {
        if y + 3 > area.bottom() {
            break;
        }
        let color = match notification.kind {
            NotificationKind::Success => Color::Green,
            NotificationKind::Error => Color::Red,
            NotificationKind::Info => Color::Blue,
        };
        let toast_area = Rect::new(area.right().saturating_sub(width + 1), y, width, 3);
        frame.render_widget(Clear, toast_area);
        let toast = Paragraph::new(notification.message.as_str()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
        frame.render_widget(toast, toast_area);
        y += 3;
    }
}

fn render_guide_bar(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    for (key, label) in get_key_hints(app) {
        spans.push(Span::styled(
            format!(" {key} "),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ));
        spans.push(Span::raw(format!(" {label}  ")));
    }
    let updated = app.state.last_updated().map_or_else(
        || "Last update: never".to_string(),
        |at| format!("Last update: {}", at.format("%Y-%m-%d %H:%M UTC")),
    );
    let guide = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::TOP).title(updated));
    frame.render_widget(guide, area);
}

fn get_key_hints(app: &App) -> Vec<(&'static str, &'static str)> {
    match app.input_mode {
        InputMode::None => vec![
            ("a", "Add"),
            ("e", "Edit"),
            ("p", "Programs"),
            ("t", "Toggle"),
            ("d", "Delete"),
            ("J/K", "Move"),
            ("b/s/f", "Filter"),
            ("?", "Help"),
            ("q", "Quit"),
        ],
        InputMode::AddMenu => vec![("j/k", "Move"), ("Enter", "Choose"), ("Esc", "Close")],
        InputMode::Editor => vec![
            ("Enter", "Edit"),
            ("Tab", "Tab"),
            ("n", "Add program"),
            ("^s", "Save"),
            ("Esc", "Cancel"),
        ],
        InputMode::EditField => vec![("Enter", "Apply"), ("Esc", "Back")],
        InputMode::Confirm => vec![("y", "Delete"), ("n", "Cancel")],
    }
}

fn render_help_popup(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);
    let help = Paragraph::new(help_text())
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: true });
    frame.render_widget(help, popup_area);
}

fn help_text() -> String {
    [
        "j/k      move selection",
        "a        add a bank from the list or a custom one",
        "e/Enter  edit the selected bank",
        "p        edit the selected bank's programs",
        "t/Space  toggle active status",
        "d        delete (asks for confirmation)",
        "J/K      move the bank down/up",
        "b        cycle the bank filter",
        "s        cycle the status filter",
        "f        cycle the program filter",
        "c        clear filters",
        "A        toggle 'apply to all projects'",
        "x        dismiss the oldest notification",
        "q        quit",
    ]
    .join("\n")
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn restore_terminal(mut terminal: Terminal<ratatui::backend::CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
