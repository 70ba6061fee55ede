use crate::app::{
    AppCommand, AppEvent, Dispatcher, Entry, Form, FormKey, ListAction, SelectList,
    SharedContext, Spinner, SpinnerStyle, StageTag, TaskEvent, TaskSignal, TextField, Ticker,
};
use crate::domain::Settings;
use crate::infra::{ClientHandle, Connector, TraderApi, TraderError};
use crossterm::event::{KeyCode, KeyEvent};
use std::fmt;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;

/// Background work behind a query screen. Runs off the UI thread and answers through `reply`.
pub type QueryFn = Arc<dyn Fn(QueryRequest) + Send + Sync>;

/// Snapshot handed to a query: the submitted field values plus what it needs to reach the API.
pub struct QueryRequest {
    pub values: Vec<String>,
    pub settings: Settings,
    pub client: Option<ClientHandle>,
    pub connector: Arc<dyn Connector>,
    pub reply: QueryReply,
}

impl QueryRequest {
    pub fn value(&self, index: usize) -> &str {
        self.values.get(index).map(String::as_str).unwrap_or("")
    }

    /// The shared client when one is connected, otherwise a fresh connection.
    pub fn connect(&self) -> Result<Arc<dyn TraderApi>, TraderError> {
        match &self.client {
            Some(ClientHandle(client)) => Ok(client.clone()),
            None => self.connector.connect(&self.settings),
        }
    }
}

/// Delivers the outcome of one query cycle, tagged with the cycle's generation.
#[derive(Clone, Debug)]
pub struct QueryReply {
    dispatcher: Dispatcher,
    stage: StageTag,
    generation: u64,
}

impl QueryReply {
    pub fn loaded(self, items: Vec<Entry>) {
        self.send(TaskSignal::QueryLoaded {
            items,
            fetched_at: OffsetDateTime::now_utc(),
        });
    }

    pub fn failed(self, error: impl fmt::Display) {
        self.send(TaskSignal::QueryFailed(error.to_string()));
    }

    fn send(self, signal: TaskSignal) {
        let delivered = self.dispatcher.dispatch(AppEvent::Task(TaskEvent {
            stage: self.stage,
            generation: self.generation,
            signal,
        }));
        if !delivered {
            debug!(stage = ?self.stage, "query finished after the inbox closed");
        }
    }
}

#[derive(Debug)]
pub enum QueryState {
    CollectingInput,
    /// The ticker drives the spinner and stops when this state is left.
    Running { ticker: Ticker },
    ShowingResults,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryOutcome {
    Stay,
    Exit,
}

/// Input form, loading indicator and result list around one remote query.
pub struct ListQuery {
    stage: StageTag,
    generation: u64,
    pub form: Form,
    pub spinner: Spinner,
    pub results: SelectList<Entry>,
    pub state: QueryState,
    pub error: Option<String>,
    pub fetched_at: Option<OffsetDateTime>,
    query: QueryFn,
}

impl fmt::Debug for ListQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListQuery")
            .field("stage", &self.stage)
            .field("generation", &self.generation)
            .field("state", &self.state)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl ListQuery {
    pub fn new(
        stage: StageTag,
        title: &str,
        fields: Vec<TextField>,
        spinner: SpinnerStyle,
        query: QueryFn,
    ) -> Self {
        Self {
            stage,
            generation: 0,
            form: Form::new(fields),
            spinner: Spinner::new(spinner),
            results: SelectList::new(title, Vec::new()),
            state: QueryState::CollectingInput,
            error: None,
            fetched_at: None,
            query,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, QueryState::Running { .. })
    }

    /// Every activation starts over at the input form. Typed values are kept.
    pub fn init(&mut self, ctx: &SharedContext) -> AppCommand {
        self.generation += 1;
        self.state = QueryState::CollectingInput;
        self.form.focus = 0;
        self.error = None;
        self.spinner.reset();
        let (width, height) = ctx.viewport;
        self.results.set_size(width, height);
        AppCommand::BlinkCursor
    }

    pub fn update(
        &mut self,
        ctx: &SharedContext,
        dispatcher: &Dispatcher,
        event: &AppEvent,
    ) -> QueryOutcome {
        match event {
            AppEvent::Resize { width, height } => {
                self.results.set_size(*width, *height);
                QueryOutcome::Stay
            }
            AppEvent::Task(task) => {
                self.on_task(task);
                QueryOutcome::Stay
            }
            AppEvent::Key(key) => self.on_key(ctx, dispatcher, key),
            AppEvent::Fatal(_) => QueryOutcome::Stay,
        }
    }

    fn on_key(
        &mut self,
        ctx: &SharedContext,
        dispatcher: &Dispatcher,
        key: &KeyEvent,
    ) -> QueryOutcome {
        if self.is_running() {
            if key.code == KeyCode::Esc {
                self.abandon();
                return QueryOutcome::Exit;
            }
            return QueryOutcome::Stay;
        }

        if matches!(self.state, QueryState::ShowingResults) {
            return match self.results.handle_key(key) {
                ListAction::Quit => QueryOutcome::Exit,
                ListAction::None | ListAction::Choose(_) => QueryOutcome::Stay,
            };
        }

        if key.code == KeyCode::Esc {
            return QueryOutcome::Exit;
        }
        match self.form.handle_key(key) {
            FormKey::Submit => self.submit(ctx, dispatcher),
            FormKey::Edited => self.error = None,
            FormKey::Moved | FormKey::Ignored => {}
        }
        QueryOutcome::Stay
    }

    fn submit(&mut self, ctx: &SharedContext, dispatcher: &Dispatcher) {
        if let Err(error) = self.form.validate() {
            self.error = Some(error);
            return;
        }

        self.generation += 1;
        let request = QueryRequest {
            values: self.form.values(),
            settings: ctx.settings.clone(),
            client: ctx.client.clone(),
            connector: ctx.connector.clone(),
            reply: QueryReply {
                dispatcher: dispatcher.clone(),
                stage: self.stage,
                generation: self.generation,
            },
        };
        let query = self.query.clone();
        dispatcher.spawn_blocking(move || query(request));
        debug!(stage = ?self.stage, generation = self.generation, "query submitted");

        let stage = self.stage;
        let generation = self.generation;
        let ticker = dispatcher.every(self.spinner.style.interval, move || {
            AppEvent::Task(TaskEvent {
                stage,
                generation,
                signal: TaskSignal::Tick,
            })
        });
        self.error = None;
        self.spinner.reset();
        self.state = QueryState::Running { ticker };
    }

    fn on_task(&mut self, task: &TaskEvent) {
        if task.generation != self.generation {
            debug!(
                stage = ?self.stage,
                generation = task.generation,
                current = self.generation,
                "discarding stale query event"
            );
            return;
        }

        if !self.is_running() {
            return;
        }
        match &task.signal {
            TaskSignal::Tick => self.spinner.advance(),
            TaskSignal::QueryLoaded { items, fetched_at } => {
                debug!(stage = ?self.stage, count = items.len(), "query loaded");
                self.results.set_items(items.clone());
                self.fetched_at = Some(*fetched_at);
                self.state = QueryState::ShowingResults;
            }
            TaskSignal::QueryFailed(error) => {
                debug!(stage = ?self.stage, %error, "query failed");
                self.error = Some(error.clone());
                self.state = QueryState::CollectingInput;
            }
            _ => {}
        }
    }

    /// Called when another stage takes over. A running cycle is abandoned so its ticker stops.
    pub fn deactivate(&mut self) {
        if self.is_running() {
            debug!(stage = ?self.stage, generation = self.generation, "query abandoned on leave");
            self.abandon();
        }
    }

    /// Leaves a running cycle behind; its late answer no longer matches the generation.
    fn abandon(&mut self) {
        self.generation += 1;
        self.state = QueryState::CollectingInput;
    }
}
