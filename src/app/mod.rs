mod dispatch;
mod error;
mod form;
mod line_editor;
mod list_query;
mod menu;
mod open_orders;
mod orderbook;
mod select_list;
mod settings;
mod spinner;

use crate::domain::Settings;
use crate::infra::{ClientHandle, Connector};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error, info};

pub use dispatch::{Dispatcher, Inbox, Ticker};
pub use error::ErrorStage;
pub use form::{Form, FormKey, TextField, require_non_empty};
pub use line_editor::LineEditor;
pub use list_query::{ListQuery, QueryOutcome, QueryRequest, QueryState};
pub use menu::MenuStage;
pub use open_orders::open_orders_query;
pub use orderbook::orderbook_query;
pub use select_list::{Entry, FilterState, ListAction, ListEntry, ROW_HEIGHT, SelectList};
pub use settings::{CONNECTED_DISPLAY_DELAY, SETTINGS_FIELD_LABELS, SettingsStage};
pub use spinner::{Spinner, SpinnerStyle};

#[cfg(test)]
pub(crate) use list_query::testing;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("terminal input failed: {0}")]
    InputClosed(String),
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum StageTag {
    Exit,
    Menu,
    Settings,
    OpenOrders,
    Orderbook,
    Error,
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    Task(TaskEvent),
    /// The input source broke. No further keys will arrive.
    Fatal(String),
}

/// Something a background task reports back, addressed to one stage's current generation.
#[derive(Clone, Debug)]
pub struct TaskEvent {
    pub stage: StageTag,
    pub generation: u64,
    pub signal: TaskSignal,
}

#[derive(Clone, Debug)]
pub enum TaskSignal {
    Tick,
    Status(String),
    ConnectFailed(String),
    Connected(ClientHandle),
    Advance,
    QueryLoaded {
        items: Vec<Entry>,
        fetched_at: OffsetDateTime,
    },
    QueryFailed(String),
}

#[derive(Clone, Debug)]
pub enum AppCommand {
    None,
    Quit,
    BlinkCursor,
    SaveSettings(Settings),
    /// Stop the loop and report the message; the Error stage is already showing it.
    Abort(String),
}

/// State every stage can read. Only the settings stage writes credentials and the client.
pub struct SharedContext {
    pub settings: Settings,
    pub client: Option<ClientHandle>,
    pub connector: Arc<dyn Connector>,
    pub viewport: (u16, u16),
    pub fatal: Option<String>,
}

impl SharedContext {
    pub fn new(settings: Settings, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            client: None,
            connector,
            viewport: (0, 0),
            fatal: None,
        }
    }
}

impl fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedContext")
            .field("settings", &self.settings)
            .field("client", &self.client)
            .field("viewport", &self.viewport)
            .field("fatal", &self.fatal)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum Stage {
    Menu(MenuStage),
    Settings(SettingsStage),
    OpenOrders(ListQuery),
    Orderbook(ListQuery),
    Error(ErrorStage),
}

impl Stage {
    fn build(tag: StageTag, ctx: &SharedContext) -> Option<Self> {
        match tag {
            StageTag::Exit => None,
            StageTag::Menu => Some(Self::Menu(MenuStage::new())),
            StageTag::Settings => Some(Self::Settings(SettingsStage::new(&ctx.settings))),
            StageTag::OpenOrders => Some(Self::OpenOrders(open_orders_query())),
            StageTag::Orderbook => Some(Self::Orderbook(orderbook_query())),
            StageTag::Error => Some(Self::Error(ErrorStage)),
        }
    }

    pub fn tag(&self) -> StageTag {
        match self {
            Self::Menu(_) => StageTag::Menu,
            Self::Settings(_) => StageTag::Settings,
            Self::OpenOrders(_) => StageTag::OpenOrders,
            Self::Orderbook(_) => StageTag::Orderbook,
            Self::Error(_) => StageTag::Error,
        }
    }

    fn init(&mut self, ctx: &SharedContext) -> AppCommand {
        match self {
            Self::Menu(stage) => stage.init(ctx),
            Self::Settings(stage) => stage.init(),
            Self::OpenOrders(query) | Self::Orderbook(query) => query.init(ctx),
            Self::Error(_) => AppCommand::None,
        }
    }

    /// Stops whatever the stage runs in the background before another stage takes over.
    fn deactivate(&mut self) {
        match self {
            Self::OpenOrders(query) | Self::Orderbook(query) => query.deactivate(),
            Self::Menu(_) | Self::Settings(_) | Self::Error(_) => {}
        }
    }

    fn update(
        self,
        ctx: &mut SharedContext,
        dispatcher: &Dispatcher,
        event: &AppEvent,
    ) -> (StageTag, Self, AppCommand) {
        match self {
            Self::Menu(stage) => {
                let (next, stage, command) = stage.update(event);
                (next, Self::Menu(stage), command)
            }
            Self::Settings(stage) => {
                let (next, stage, command) = stage.update(ctx, dispatcher, event);
                (next, Self::Settings(stage), command)
            }
            Self::OpenOrders(mut query) => {
                let next = query_target(StageTag::OpenOrders, query.update(ctx, dispatcher, event));
                (next, Self::OpenOrders(query), AppCommand::None)
            }
            Self::Orderbook(mut query) => {
                let next = query_target(StageTag::Orderbook, query.update(ctx, dispatcher, event));
                (next, Self::Orderbook(query), AppCommand::None)
            }
            Self::Error(stage) => {
                let (next, stage, command) = stage.update(event);
                (next, Self::Error(stage), command)
            }
        }
    }
}

fn query_target(own: StageTag, outcome: QueryOutcome) -> StageTag {
    match outcome {
        QueryOutcome::Stay => own,
        QueryOutcome::Exit => StageTag::Menu,
    }
}

#[derive(Debug)]
pub struct AppModel {
    pub active: StageTag,
    pub stages: BTreeMap<StageTag, Stage>,
    pub ctx: SharedContext,
    dispatcher: Dispatcher,
}

impl AppModel {
    pub fn active_stage(&self) -> Option<&Stage> {
        self.stages.get(&self.active)
    }
}

/// Builds the persistent stages and activates the first one.
pub fn init(ctx: SharedContext, dispatcher: Dispatcher) -> (AppModel, AppCommand) {
    let mut stages = BTreeMap::new();
    for tag in [StageTag::Menu, StageTag::Settings, StageTag::Error] {
        if let Some(stage) = Stage::build(tag, &ctx) {
            stages.insert(tag, stage);
        }
    }
    let first = if ctx.settings.needs_init() {
        StageTag::Settings
    } else {
        StageTag::Menu
    };
    let model = AppModel {
        active: first,
        stages,
        ctx,
        dispatcher,
    };
    activate(model, first)
}

pub fn update(model: AppModel, event: AppEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    match &event {
        AppEvent::Key(key) if is_global_quit(key) => return (model, AppCommand::Quit),
        AppEvent::Resize { width, height } => model.ctx.viewport = (*width, *height),
        AppEvent::Fatal(message) => {
            let (model, _) = fail(model, message.clone());
            return (model, AppCommand::Abort(message.clone()));
        }
        AppEvent::Task(task) if task.stage != model.active => {
            debug!(
                stage = ?task.stage,
                active = ?model.active,
                "discarding event for inactive stage"
            );
            return (model, AppCommand::None);
        }
        _ => {}
    }

    let current = model.active;
    let Some(stage) = model.stages.remove(&current) else {
        error!(stage = ?current, "active stage has no instance");
        return fail(model, format!("no instance for stage {current:?}"));
    };
    let (next, stage, command) = stage.update(&mut model.ctx, &model.dispatcher, &event);
    model.stages.insert(current, stage);

    if next == current {
        return (model, command);
    }
    if next == StageTag::Exit {
        info!(from = ?current, "exit requested");
        return (model, AppCommand::Quit);
    }
    // The outgoing stage's command is dropped; the target's init decides.
    activate(model, next)
}

fn activate(model: AppModel, target: StageTag) -> (AppModel, AppCommand) {
    let mut model = model;
    if !model.stages.contains_key(&target) {
        match Stage::build(target, &model.ctx) {
            Some(stage) => {
                model.stages.insert(target, stage);
            }
            None => return (model, AppCommand::Quit),
        }
    }

    if model.active != target {
        deactivate_active(&mut model);
    }
    let Some(stage) = model.stages.get_mut(&target) else {
        return fail(model, format!("no instance for stage {target:?}"));
    };
    let command = stage.init(&model.ctx);
    info!(from = ?model.active, to = ?target, "stage transition");
    model.active = target;
    (model, command)
}

fn fail(model: AppModel, message: String) -> (AppModel, AppCommand) {
    let mut model = model;
    error!(%message, "fatal error");
    model.ctx.fatal = Some(message);
    if model.active != StageTag::Error {
        deactivate_active(&mut model);
    }
    match model.stages.get_mut(&StageTag::Error) {
        Some(stage) => {
            let command = stage.init(&model.ctx);
            model.active = StageTag::Error;
            (model, command)
        }
        None => (model, AppCommand::Quit),
    }
}

fn deactivate_active(model: &mut AppModel) {
    if let Some(stage) = model.stages.get_mut(&model.active) {
        stage.deactivate();
    }
}

fn is_global_quit(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
}

#[cfg(test)]
mod tests {
    use super::list_query::testing::{RefusingConnector, harness};
    use super::*;
    use crate::domain::fixtures::valid_input;
    use crate::domain::{Order, Orderbook, Project, PublicKey, Side, validate_settings};
    use crate::infra::{TraderApi, TraderError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    struct FakeTrader {
        orders: Vec<Order>,
        calls: Arc<AtomicUsize>,
    }

    impl TraderApi for FakeTrader {
        fn open_orders(
            &self,
            market: &str,
            _owner: PublicKey,
            _open_orders_address: PublicKey,
            _project: Project,
        ) -> Result<Vec<Order>, TraderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(market, "SOLUSDC");
            Ok(self.orders.clone())
        }

        fn orderbook(
            &self,
            _market: &str,
            _limit: Option<u32>,
            _project: Project,
        ) -> Result<Orderbook, TraderError> {
            Ok(Orderbook::default())
        }
    }

    struct FakeConnector {
        calls: Arc<AtomicUsize>,
    }

    impl Connector for FakeConnector {
        fn connect(&self, _settings: &Settings) -> Result<Arc<dyn TraderApi>, TraderError> {
            Ok(Arc::new(FakeTrader {
                orders: three_orders(),
                calls: self.calls.clone(),
            }))
        }
    }

    fn three_orders() -> Vec<Order> {
        ["1", "2", "3"]
            .iter()
            .map(|id| Order {
                order_id: id.to_string(),
                side: Side::Ask,
                types: vec!["OT_LIMIT".to_string()],
                price: 10.0,
                remaining_size: 1.0,
                client_order_id: format!("c{id}"),
            })
            .collect()
    }

    fn fake_context(settings: Settings) -> (SharedContext, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let connector = FakeConnector {
            calls: calls.clone(),
        };
        (SharedContext::new(settings, Arc::new(connector)), calls)
    }

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(model: AppModel, text: &str) -> AppModel {
        text.chars()
            .fold(model, |model, ch| update(model, press(KeyCode::Char(ch))).0)
    }

    /// Feeds inbox events to the reducer until `done` holds.
    fn pump_until(
        mut model: AppModel,
        inbox: &mut Inbox,
        done: impl Fn(&AppModel) -> bool,
    ) -> (AppModel, Vec<AppCommand>) {
        let deadline = Instant::now() + Duration::from_secs(3);
        let mut commands = Vec::new();
        while !done(&model) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            assert!(!remaining.is_zero(), "timed out in stage {:?}", model.active);
            if let Some(event) = inbox.recv_timeout(remaining) {
                let (next, command) = update(model, event);
                model = next;
                commands.push(command);
            }
        }
        (model, commands)
    }

    fn query(model: &AppModel, tag: StageTag) -> &ListQuery {
        match model.stages.get(&tag) {
            Some(Stage::OpenOrders(query)) | Some(Stage::Orderbook(query)) => query,
            other => panic!("expected a query stage, got {other:?}"),
        }
    }

    #[test]
    fn initial_stage_depends_on_credentials() {
        let harness = harness();
        let (ctx, _) = fake_context(Settings::default());
        let (model, command) = init(ctx, harness.dispatcher.clone());
        assert_eq!(model.active, StageTag::Settings);
        assert!(matches!(command, AppCommand::BlinkCursor));

        let settings = validate_settings(&valid_input()).expect("valid");
        let (ctx, _) = fake_context(settings);
        let (model, command) = init(ctx, harness.dispatcher.clone());
        assert_eq!(model.active, StageTag::Menu);
        assert!(matches!(command, AppCommand::None));
        assert!(!model.stages.contains_key(&StageTag::OpenOrders));
    }

    #[test]
    fn empty_settings_connect_then_advance_to_menu() {
        let mut harness = harness();
        let (ctx, _) = fake_context(Settings::default());
        let (model, _) = init(ctx, harness.dispatcher.clone());

        let input = valid_input();
        let mut model = model;
        for value in [
            &input.auth_header,
            &input.private_key,
            &input.public_key,
            &input.open_orders_address,
            &input.project,
        ] {
            model = type_text(model, value);
            model = update(model, press(KeyCode::Tab)).0;
        }
        let (model, command) = update(model, press(KeyCode::Enter));
        assert!(matches!(command, AppCommand::None));
        assert_eq!(model.active, StageTag::Settings);

        let started = Instant::now();
        let (model, commands) =
            pump_until(model, &mut harness.inbox, |model| model.active == StageTag::Menu);
        assert!(started.elapsed() >= CONNECTED_DISPLAY_DELAY);
        assert!(model.ctx.client.is_some());
        assert!(
            commands
                .iter()
                .any(|command| matches!(command, AppCommand::SaveSettings(s) if s.auth_header == "auth-token"))
        );
    }

    #[test]
    fn open_orders_from_menu_shows_three_results() {
        let mut harness = harness();
        let settings = validate_settings(&valid_input()).expect("valid");
        let (ctx, calls) = fake_context(settings);
        let (model, _) = init(ctx, harness.dispatcher.clone());
        assert_eq!(model.active, StageTag::Menu);

        let (model, _) = update(model, press(KeyCode::Down));
        let (model, command) = update(model, press(KeyCode::Enter));
        assert_eq!(model.active, StageTag::OpenOrders);
        assert!(matches!(command, AppCommand::BlinkCursor));
        assert!(matches!(
            query(&model, StageTag::OpenOrders).state,
            QueryState::CollectingInput
        ));

        let model = type_text(model, "SOLUSDC");
        let (model, _) = update(model, press(KeyCode::Tab));
        let (model, _) = update(model, press(KeyCode::Enter));
        assert!(query(&model, StageTag::OpenOrders).is_running());

        let (model, _) = pump_until(model, &mut harness.inbox, |model| {
            matches!(
                query(model, StageTag::OpenOrders).state,
                QueryState::ShowingResults
            )
        });
        let results = &query(&model, StageTag::OpenOrders).results;
        assert_eq!(results.visible_len(), 3);
        let titles: Vec<&str> = results.visible().map(|entry| entry.title.as_str()).collect();
        assert_eq!(titles, vec!["[ASK] 1 (c1)", "[ASK] 2 (c2)", "[ASK] 3 (c3)"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (model, _) = update(model, press(KeyCode::Char('q')));
        assert_eq!(model.active, StageTag::Menu);
    }

    #[test]
    fn active_stage_always_has_an_instance() {
        let harness = harness();
        let (ctx, _) = fake_context(Settings::default());
        let (mut model, _) = init(ctx, harness.dispatcher.clone());
        model.ctx.settings.auth_header = "token".to_string();

        let codes = [
            KeyCode::Esc,
            KeyCode::Enter,
            KeyCode::Down,
            KeyCode::Up,
            KeyCode::Tab,
            KeyCode::Char('q'),
            KeyCode::Char('/'),
            KeyCode::Char('x'),
            KeyCode::BackTab,
        ];
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for step in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let event = if step % 37 == 0 {
                AppEvent::Resize {
                    width: 40 + (seed % 80) as u16,
                    height: 10 + (seed % 40) as u16,
                }
            } else {
                press(codes[(seed % codes.len() as u64) as usize])
            };
            let (next, command) = update(model, event);
            model = next;
            assert!(model.stages.contains_key(&model.active));
            if matches!(command, AppCommand::Quit) {
                model = activate(model, StageTag::Menu).0;
            }
        }
    }

    #[test]
    fn resize_reaches_stages_on_their_next_activation() {
        let harness = harness();
        let settings = validate_settings(&valid_input()).expect("valid");
        let (ctx, _) = fake_context(settings);
        let (model, _) = init(ctx, harness.dispatcher.clone());

        let (model, _) = update(
            model,
            AppEvent::Resize {
                width: 100,
                height: 40,
            },
        );
        let (model, _) = update(model, press(KeyCode::Down));
        let (model, _) = update(model, press(KeyCode::Enter));
        assert_eq!(query(&model, StageTag::OpenOrders).results.size(), (100, 40));

        let (model, _) = update(model, press(KeyCode::Esc));
        assert_eq!(model.active, StageTag::Menu);
        let (model, _) = update(
            model,
            AppEvent::Resize {
                width: 120,
                height: 50,
            },
        );
        assert_eq!(query(&model, StageTag::OpenOrders).results.size(), (100, 40));

        let (model, _) = update(model, press(KeyCode::Enter));
        assert_eq!(model.active, StageTag::OpenOrders);
        assert_eq!(query(&model, StageTag::OpenOrders).results.size(), (120, 50));
    }

    #[test]
    fn events_for_inactive_stages_are_discarded() {
        let harness = harness();
        let settings = validate_settings(&valid_input()).expect("valid");
        let (ctx, _) = fake_context(settings);
        let (model, _) = init(ctx, harness.dispatcher.clone());
        let (model, _) = update(model, press(KeyCode::Down));
        let (model, _) = update(model, press(KeyCode::Enter));
        let (model, _) = update(model, press(KeyCode::Esc));
        assert_eq!(model.active, StageTag::Menu);

        let generation = query(&model, StageTag::OpenOrders).generation();
        let (model, _) = update(
            model,
            AppEvent::Task(TaskEvent {
                stage: StageTag::OpenOrders,
                generation,
                signal: TaskSignal::QueryLoaded {
                    items: vec![Entry::new("late".to_string(), String::new())],
                    fetched_at: OffsetDateTime::now_utc(),
                },
            }),
        );
        assert_eq!(model.active, StageTag::Menu);
        assert_eq!(query(&model, StageTag::OpenOrders).results.visible_len(), 0);
    }

    #[test]
    fn global_quit_bypasses_stage_routing() {
        let harness = harness();
        let (ctx, _) = fake_context(Settings::default());
        let (model, _) = init(ctx, harness.dispatcher.clone());
        let model = type_text(model, "abc");
        let (model, command) = update(
            model,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(matches!(command, AppCommand::Quit));
        let Some(Stage::Settings(stage)) = model.active_stage() else {
            panic!("expected settings stage");
        };
        assert_eq!(stage.input().auth_header, "abc");
    }

    #[test]
    fn missing_stage_and_fatal_events_land_on_error_stage() {
        let harness = harness();
        let ctx = SharedContext::new(Settings::default(), Arc::new(RefusingConnector));
        let (mut model, _) = init(ctx, harness.dispatcher.clone());
        model.stages.remove(&StageTag::Settings);

        let (model, _) = update(model, press(KeyCode::Char('a')));
        assert_eq!(model.active, StageTag::Error);
        assert_eq!(
            model.ctx.fatal.as_deref(),
            Some("no instance for stage Settings")
        );
        let (model, command) = update(model, press(KeyCode::Char('a')));
        assert_eq!(model.active, StageTag::Error);
        assert!(matches!(command, AppCommand::None));
        let (_, command) = update(model, press(KeyCode::Esc));
        assert!(matches!(command, AppCommand::Quit));

        let ctx = SharedContext::new(Settings::default(), Arc::new(RefusingConnector));
        let (model, _) = init(ctx, harness.dispatcher.clone());
        let (model, command) = update(model, AppEvent::Fatal("input closed".to_string()));
        assert_eq!(model.active, StageTag::Error);
        assert_eq!(model.ctx.fatal.as_deref(), Some("input closed"));
        assert!(matches!(command, AppCommand::Abort(message) if message == "input closed"));
    }

    #[test]
    fn fatal_while_querying_stops_the_ticker() {
        let mut harness = harness();
        let settings = validate_settings(&valid_input()).expect("valid");
        let (ctx, _) = fake_context(settings);
        let (model, _) = init(ctx, harness.dispatcher.clone());
        let (model, _) = update(model, press(KeyCode::Down));
        let (model, _) = update(model, press(KeyCode::Enter));
        let model = type_text(model, "SOL");
        let (model, _) = update(model, press(KeyCode::Tab));
        let (model, _) = update(model, press(KeyCode::Enter));
        assert!(query(&model, StageTag::OpenOrders).is_running());

        let (model, _) = update(model, AppEvent::Fatal("input closed".to_string()));
        assert_eq!(model.active, StageTag::Error);
        assert!(!query(&model, StageTag::OpenOrders).is_running());

        let _ = harness.inbox.collect_for(Duration::from_millis(150));
        let ticks = harness
            .inbox
            .collect_for(Duration::from_millis(500))
            .into_iter()
            .filter(|event| {
                matches!(
                    event,
                    AppEvent::Task(TaskEvent {
                        signal: TaskSignal::Tick,
                        ..
                    })
                )
            })
            .count();
        assert_eq!(ticks, 0);
    }

    #[test]
    fn leaving_a_running_query_for_another_stage_stops_it() {
        let harness = harness();
        let settings = validate_settings(&valid_input()).expect("valid");
        let (ctx, _) = fake_context(settings);
        let (model, _) = init(ctx, harness.dispatcher.clone());
        let (model, _) = update(model, press(KeyCode::Down));
        let (model, _) = update(model, press(KeyCode::Enter));
        let model = type_text(model, "SOL");
        let (model, _) = update(model, press(KeyCode::Tab));
        let (model, _) = update(model, press(KeyCode::Enter));
        assert!(query(&model, StageTag::OpenOrders).is_running());

        let model = activate(model, StageTag::Menu).0;
        assert_eq!(model.active, StageTag::Menu);
        assert!(!query(&model, StageTag::OpenOrders).is_running());
    }
}
