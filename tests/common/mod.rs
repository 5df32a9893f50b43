#![allow(dead_code)]

use async_trait::async_trait;
use opscope::operations::CompletionCommand;
use opscope::transaction::TransactionId;
use opscope::{
    Command, CommandContext, CommandHandler, Commander, CommanderBuilder, Completion,
    ExecutionMode, InMemoryStore, OpError, Operation, OperationCompletionNotifier,
    OperationFramework, OperationStore, OperationsConfig, Result, StoreTransaction,
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn push(events: &EventLog, event: impl Into<String>) {
    events.lock().unwrap().push(event.into());
}

pub fn events_of(events: &EventLog) -> Vec<String> {
    events.lock().unwrap().clone()
}

pub fn count(events: &EventLog, event: &str) -> usize {
    events.lock().unwrap().iter().filter(|e| *e == event).count()
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BankError {
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),
}

#[derive(Debug, Clone)]
pub struct Deposit {
    pub account: String,
    pub amount: i64,
}

impl Deposit {
    pub fn new(amount: i64) -> Self {
        Self {
            account: "main".to_string(),
            amount,
        }
    }
}

impl Command for Deposit {
    fn payload(&self) -> Value {
        json!({ "account": self.account, "amount": self.amount })
    }
}

/// Splits a deposit into nested `Deposit` commands.
#[derive(Debug, Clone)]
pub struct SplitDeposit {
    pub account: String,
    pub parts: Vec<i64>,
}

impl Command for SplitDeposit {}

/// Reads without mutating: its scope is never used.
#[derive(Debug, Clone)]
pub struct Inspect;

impl Command for Inspect {}

/// Stages a write, then observes (or requests) cancellation.
#[derive(Debug, Clone)]
pub struct CancelMidway {
    pub cancel_itself: bool,
}

impl Command for CancelMidway {}

pub fn balance_key(account: &str) -> String {
    format!("balances/{}", account)
}

#[derive(Debug, Clone)]
pub struct Observation {
    pub command: &'static str,
    pub top_level: bool,
    pub own_scope: bool,
    pub transaction: Option<TransactionId>,
    pub mode: ExecutionMode,
}

pub type Observations = Arc<Mutex<Vec<Observation>>>;

fn observe(observations: &Observations, ctx: &CommandContext) {
    observations.lock().unwrap().push(Observation {
        command: ctx.command().name(),
        top_level: ctx.is_top_level(),
        own_scope: ctx.items().scope().is_some(),
        transaction: ctx.operation_scope().map(|scope| scope.transaction_id()),
        mode: ctx.mode(),
    });
}

pub struct DepositHandler {
    pub events: EventLog,
    pub observations: Observations,
}

#[async_trait]
impl CommandHandler<Deposit> for DepositHandler {
    async fn handle(&self, command: &Deposit, ctx: &mut CommandContext) -> Result<()> {
        observe(&self.observations, ctx);
        if ctx.is_invalidating() {
            push(&self.events, "invalidate:Deposit");
            return Ok(());
        }
        push(&self.events, "handler:Deposit");

        if command.amount <= 0 {
            return Err(anyhow::Error::new(BankError::InvalidAmount(command.amount)).into());
        }

        let scope = ctx.require_operation_scope()?;
        let key = balance_key(&command.account);
        let balance = scope
            .get(&key)
            .await?
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        scope.put(&key, json!(balance + command.amount)).await?;
        ctx.capture("account", json!(command.account));
        Ok(())
    }
}

pub struct SplitDepositHandler {
    pub events: EventLog,
    pub observations: Observations,
}

#[async_trait]
impl CommandHandler<SplitDeposit> for SplitDepositHandler {
    async fn handle(&self, command: &SplitDeposit, ctx: &mut CommandContext) -> Result<()> {
        observe(&self.observations, ctx);
        push(&self.events, "handler:SplitDeposit");
        for amount in &command.parts {
            ctx.call(Deposit {
                account: command.account.clone(),
                amount: *amount,
            })
            .await?;
        }
        ctx.capture("parts", json!(command.parts.len()));
        Ok(())
    }
}

pub struct InspectHandler {
    pub events: EventLog,
    pub observations: Observations,
}

#[async_trait]
impl CommandHandler<Inspect> for InspectHandler {
    async fn handle(&self, _command: &Inspect, ctx: &mut CommandContext) -> Result<()> {
        observe(&self.observations, ctx);
        push(&self.events, "handler:Inspect");
        if let Some(scope) = ctx.operation_scope() {
            scope.get(&balance_key("main")).await?;
        }
        Ok(())
    }
}

pub struct CancelMidwayHandler {
    pub events: EventLog,
}

#[async_trait]
impl CommandHandler<CancelMidway> for CancelMidwayHandler {
    async fn handle(&self, command: &CancelMidway, ctx: &mut CommandContext) -> Result<()> {
        push(&self.events, "handler:CancelMidway");
        let scope = ctx.require_operation_scope()?;
        scope.put(&balance_key("main"), json!(999)).await?;
        if command.cancel_itself {
            ctx.cancellation().cancel();
            return Ok(());
        }
        ctx.check_cancelled()
    }
}

// ============================================================================
// Recording collaborators
// ============================================================================

/// Store wrapper that logs begin/commit/rollback and can be told to fail.
#[derive(Clone)]
pub struct RecordingStore {
    pub inner: InMemoryStore,
    pub events: EventLog,
    pub fail_commit: Arc<AtomicBool>,
    pub fail_rollback: Arc<AtomicBool>,
}

impl RecordingStore {
    pub fn new(inner: InMemoryStore, events: EventLog) -> Self {
        Self {
            inner,
            events,
            fail_commit: Arc::new(AtomicBool::new(false)),
            fail_rollback: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl OperationStore for RecordingStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        push(&self.events, "begin");
        Ok(Box::new(RecordingTransaction {
            inner: self.inner.begin().await?,
            store: self.clone(),
        }))
    }
}

struct RecordingTransaction {
    inner: Box<dyn StoreTransaction>,
    store: RecordingStore,
}

#[async_trait]
impl StoreTransaction for RecordingTransaction {
    fn id(&self) -> TransactionId {
        self.inner.id()
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.inner.get(key).await
    }

    async fn put(&mut self, key: &str, value: Value) -> Result<()> {
        self.inner.put(key, value).await
    }

    async fn delete(&mut self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }

    fn has_changes(&self) -> bool {
        self.inner.has_changes()
    }

    async fn commit(&mut self, operation: &Operation) -> Result<()> {
        push(&self.store.events, "commit");
        if self.store.fail_commit.load(Ordering::SeqCst) {
            return Err(OpError::StoreError("commit refused".to_string()));
        }
        self.inner.commit(operation).await
    }

    async fn rollback(&mut self) -> Result<()> {
        push(&self.store.events, "rollback");
        self.inner.rollback().await?;
        if self.store.fail_rollback.load(Ordering::SeqCst) {
            return Err(OpError::StoreError("connection lost".to_string()));
        }
        Ok(())
    }

    fn discard(&mut self) {
        push(&self.store.events, "discard");
        self.inner.discard();
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: EventLog,
    pub operations: Mutex<Vec<Operation>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.operations.lock().unwrap().clone()
    }
}

#[async_trait]
impl OperationCompletionNotifier for RecordingNotifier {
    async fn notify_completed(&self, operation: &Operation) -> Result<()> {
        push(&self.events, format!("notify:{}", operation.command().name()));
        self.operations.lock().unwrap().push(operation.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(OpError::StoreError("notifier offline".to_string()));
        }
        Ok(())
    }
}

pub type Completions = Arc<Mutex<Vec<Completion>>>;

pub struct RecordingCompletionHandler {
    pub events: EventLog,
    pub completions: Completions,
    pub fail: bool,
}

#[async_trait]
impl CommandHandler<Completion> for RecordingCompletionHandler {
    async fn handle(&self, completion: &Completion, _ctx: &mut CommandContext) -> Result<()> {
        push(
            &self.events,
            format!("completion:{}", completion.command().name()),
        );
        self.completions.lock().unwrap().push(completion.clone());
        if self.fail {
            return Err(OpError::StoreError("completion sink down".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub store: InMemoryStore,
    pub recording: RecordingStore,
    pub events: EventLog,
    pub observations: Observations,
    pub notifier: Arc<RecordingNotifier>,
    pub completions: Completions,
    pub commander: Commander,
}

impl Harness {
    pub fn completions(&self) -> Vec<Completion> {
        self.completions.lock().unwrap().clone()
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<String> {
        events_of(&self.events)
    }

    pub fn count(&self, event: &str) -> usize {
        count(&self.events, event)
    }
}

pub struct HarnessBuilder {
    store: InMemoryStore,
    config: OperationsConfig,
    framework: Option<Box<dyn FnOnce(OperationFramework) -> OperationFramework>>,
    extra: Option<Box<dyn FnOnce(CommanderBuilder, &RecordingStore) -> CommanderBuilder>>,
    fail_completion: bool,
    with_operations: bool,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
            config: OperationsConfig::default(),
            framework: None,
            extra: None,
            fail_completion: false,
            with_operations: true,
        }
    }

    pub fn store(mut self, store: InMemoryStore) -> Self {
        self.store = store;
        self
    }

    pub fn config(mut self, config: OperationsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn framework(
        mut self,
        customize: impl FnOnce(OperationFramework) -> OperationFramework + 'static,
    ) -> Self {
        self.framework = Some(Box::new(customize));
        self
    }

    pub fn extra(
        mut self,
        customize: impl FnOnce(CommanderBuilder, &RecordingStore) -> CommanderBuilder + 'static,
    ) -> Self {
        self.extra = Some(Box::new(customize));
        self
    }

    pub fn fail_completion(mut self) -> Self {
        self.fail_completion = true;
        self
    }

    pub fn without_operations(mut self) -> Self {
        self.with_operations = false;
        self
    }

    pub fn build(self) -> Harness {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let observations: Observations = Arc::new(Mutex::new(Vec::new()));
        let completions: Completions = Arc::new(Mutex::new(Vec::new()));
        let recording = RecordingStore::new(self.store.clone(), events.clone());
        let notifier = Arc::new(RecordingNotifier::new(events.clone()));

        let mut builder = Commander::builder()
            .add_handler::<Deposit, _>(DepositHandler {
                events: events.clone(),
                observations: observations.clone(),
            })
            .add_handler::<SplitDeposit, _>(SplitDepositHandler {
                events: events.clone(),
                observations: observations.clone(),
            })
            .add_handler::<Inspect, _>(InspectHandler {
                events: events.clone(),
                observations: observations.clone(),
            })
            .add_handler::<CancelMidway, _>(CancelMidwayHandler {
                events: events.clone(),
            })
            .add_handler::<Completion, _>(RecordingCompletionHandler {
                events: events.clone(),
                completions: completions.clone(),
                fail: self.fail_completion,
            });

        if self.with_operations {
            let mut framework = OperationFramework::new(Arc::new(recording.clone()))
                .with_config(self.config)
                .expect("valid config")
                .with_notifier(notifier.clone());
            if let Some(customize) = self.framework {
                framework = customize(framework);
            }
            builder = framework.install(builder);
        }
        if let Some(extra) = self.extra {
            builder = extra(builder, &recording);
        }

        Harness {
            store: self.store,
            recording,
            events,
            observations,
            notifier,
            completions,
            commander: builder.build(),
        }
    }
}

pub fn harness() -> Harness {
    HarnessBuilder::new().build()
}
