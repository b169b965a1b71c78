use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::auth_client::AuthClient;
use crate::command::{parse_command, Command, DraftField, HELP};
use crate::console::ConsolePresenter;
use crate::datetime;
use crate::history::{HistoryList, HistoryListener};
use crate::profile::{ProfileDialog, RouteRefresher};
use crate::store::EntryStore;
use crate::time_entry::{format_elapsed, Activity, NewTimeEntry, TimeEntry};
use crate::tracker::Tracker;

/// 履歴一覧とプロフィールダイアログから届く通知。
#[derive(Debug)]
enum AppEvent {
    StartAgain(TimeEntry),
    Refresh,
}

/// ウィジェットからの通知をイベントループへ送る。
#[derive(Clone)]
struct AppEvents {
    tx: UnboundedSender<AppEvent>,
}

impl AppEvents {
    fn send(&self, event: AppEvent) {
        if self.tx.send(event).is_err() {
            warn!("Event loop is gone, notification dropped");
        }
    }
}

#[async_trait]
impl HistoryListener for AppEvents {
    fn start_again(&self, entry: &TimeEntry) {
        self.send(AppEvent::StartAgain(entry.clone()));
    }

    async fn entry_updated(&self) -> Result<()> {
        self.send(AppEvent::Refresh);
        Ok(())
    }
}

impl RouteRefresher for AppEvents {
    fn refresh(&self) {
        self.send(AppEvent::Refresh);
    }
}

/// 計測ウィジェット、履歴一覧、プロフィールダイアログを束ねる対話セッション。
///
/// 1行ずつ読んだコマンド、1秒ごとの刻み、ウィジェットからの通知を単一のループで順に処理する。
pub struct App<A: AuthClient + 'static, E: EntryStore, P: ConsolePresenter> {
    tracker: Tracker<UnboundedSender<NewTimeEntry>>,
    finished_tx: UnboundedSender<NewTimeEntry>,
    finished_rx: UnboundedReceiver<NewTimeEntry>,
    history: HistoryList,
    events: AppEvents,
    events_rx: UnboundedReceiver<AppEvent>,
    profile: ProfileDialog<A>,
    store: Arc<E>,
    presenter: P,
}

impl<A: AuthClient + 'static, E: EntryStore, P: ConsolePresenter> App<A, E, P> {
    /// 新しい`App`を返す。プロフィールダイアログのセッション取得もここで始まる。
    ///
    /// tokioのランタイム上で呼び出す必要がある。
    pub fn new(auth: Arc<A>, store: Arc<E>, presenter: P) -> Self {
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            tracker: Tracker::new(finished_tx.clone()),
            finished_tx,
            finished_rx,
            history: HistoryList::new(Vec::new()),
            events: AppEvents { tx: events_tx },
            events_rx,
            profile: ProfileDialog::mount(auth),
            store,
            presenter,
        }
    }

    pub fn tracker_mut(&mut self) -> &mut Tracker<UnboundedSender<NewTimeEntry>> {
        &mut self.tracker
    }

    pub fn into_presenter(self) -> P {
        self.presenter
    }

    /// 入力が尽きるか`quit`が入力されるまでセッションを続ける。
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
        self.refresh_history().await;
        self.presenter.show_tracker(&self.tracker.view())?;
        let mut lines = input.lines();

        loop {
            tokio::select! {
                biased;

                Some(entry) = self.finished_rx.recv() => self.store_entry(entry).await?,
                Some(event) = self.events_rx.recv() => self.handle_event(event).await?,
                _ = self.profile.fetched() => debug!("Session fetch finished"),
                elapsed = self.tracker.next_tick() => {
                    self.presenter.show_elapsed(&format_elapsed(elapsed))?
                }
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read input")? else {
                        info!("End of input");
                        break;
                    };
                    if !self.handle_line(&line).await? {
                        break;
                    }
                }
            }
        }

        if self.tracker.elapsed() > 0 {
            warn!(
                "Leaving with {}s of unsaved tracking",
                self.tracker.elapsed()
            );
        }
        Ok(())
    }

    /// 1行分の入力を処理する。セッションを終える場合は`false`を返す。
    async fn handle_line(&mut self, line: &str) -> Result<bool> {
        let command = match parse_command(line) {
            Ok(Some(Command::Quit)) => return Ok(false),
            Ok(Some(command)) => command,
            Ok(None) => return Ok(true),
            Err(err) => {
                self.presenter.show_message(&format!("{:#}", err))?;
                return Ok(true);
            }
        };

        if let Err(err) = self.execute(command).await {
            self.presenter.show_message(&format!("Error: {:#}", err))?;
        }
        Ok(true)
    }

    async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Start => {
                if !self.tracker.start() {
                    return self.presenter.show_message("Timer is already running");
                }
                self.presenter.show_tracker(&self.tracker.view())
            }
            Command::Pause => {
                if !self.tracker.pause() {
                    return self.presenter.show_message("Timer is not running");
                }
                self.presenter.show_tracker(&self.tracker.view())
            }
            Command::Stop => {
                if !self.tracker.stop() {
                    return self.presenter.show_message("Nothing to stop yet");
                }
                self.presenter.show_message("Stopped")
            }
            Command::Activity(name) => {
                let activity = Activity::parse(&name).context("Activity must not be empty")?;
                self.edit_tracker(|tracker| tracker.set_activity(activity))
            }
            Command::Describe(description) => self.edit_tracker(|tracker| {
                tracker.set_description(description.as_deref().unwrap_or_default())
            }),
            Command::Tag(tag) => self.edit_tracker(|tracker| tracker.add_tag(&tag)),
            Command::Untag(tag) => self.edit_tracker(|tracker| tracker.remove_tag(&tag)),
            Command::Status => self.presenter.show_tracker(&self.tracker.view()),
            Command::History => self
                .presenter
                .show_history(self.history.entries(), datetime::now()),
            Command::Again(index) => self.history.start_again(index, &self.events),
            Command::Edit(index) => {
                let draft = self.history.open_edit(index)?;
                self.presenter.show_draft(draft)
            }
            Command::Set(field) => {
                let draft = self
                    .history
                    .draft_mut()
                    .context("No entry is being edited, use edit <n> first")?;
                match field {
                    DraftField::Activity(activity) => draft.set_activity(&activity)?,
                    DraftField::Description(description) => {
                        draft.set_description(description.as_deref())
                    }
                    DraftField::Elapsed(elapsed) => draft.set_elapsed(elapsed),
                    DraftField::Tags(tags) => draft.set_tags(tags.iter().map(String::as_str)),
                }
                self.presenter.show_draft(draft)
            }
            Command::Save => {
                self.history
                    .save_edit(self.store.as_ref(), &self.events)
                    .await?;
                self.presenter.show_message("Entry saved")
            }
            Command::Cancel => {
                if self.history.cancel_edit() {
                    self.presenter.show_message("Edit cancelled")
                } else {
                    self.presenter.show_message("No entry is being edited")
                }
            }
            Command::Profile => {
                if self.profile.is_loading() {
                    self.presenter.show_message("Loading session...")?;
                }
                self.presenter.show_profile(&self.profile.view())
            }
            Command::SignIn { email, password } => {
                self.profile.sign_in(&email, &password).await?;
                self.presenter.show_profile(&self.profile.view())
            }
            Command::SignUp {
                name,
                email,
                password,
            } => {
                self.profile.sign_up(&name, &email, &password).await?;
                self.presenter.show_profile(&self.profile.view())
            }
            Command::SignOut => {
                if self.profile.is_loading() {
                    return self.presenter.show_message("Session is still loading");
                }
                if self.profile.session().is_none() {
                    return self.presenter.show_message("Not signed in");
                }
                self.profile.sign_out(&self.events).await;
                self.presenter.show_profile(&self.profile.view())
            }
            Command::Help => self.presenter.show_message(HELP),
            Command::Quit => Ok(()),
        }
    }

    /// 計測中でなければ変更を適用して表示する。
    fn edit_tracker<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Tracker<UnboundedSender<NewTimeEntry>>) -> bool,
    {
        if self.tracker.is_running() {
            return self
                .presenter
                .show_message("Pause the timer before changing the entry");
        }
        if !edit(&mut self.tracker) {
            debug!("Tracker edit had no effect");
        }
        self.presenter.show_tracker(&self.tracker.view())
    }

    async fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::StartAgain(entry) => {
                if self.tracker.elapsed() > 0 {
                    warn!(
                        "Discarding {}s of unsaved tracking to start again",
                        self.tracker.elapsed()
                    );
                }
                // 古いトラッカーと共に刻みのタイマーも破棄される
                self.tracker = Tracker::seeded_from(&entry, self.finished_tx.clone());
                self.presenter.show_tracker(&self.tracker.view())
            }
            AppEvent::Refresh => {
                self.refresh_history().await;
                Ok(())
            }
        }
    }

    async fn store_entry(&mut self, entry: NewTimeEntry) -> Result<()> {
        match self.store.create(entry).await {
            Ok(entry) => {
                info!("Saved time entry {}", entry.id);
                self.refresh_history().await;
                Ok(())
            }
            Err(err) => {
                error!("Failed to save time entry: {:#}", err);
                self.presenter
                    .show_message(&format!("Could not save the entry: {:#}", err))
            }
        }
    }

    async fn refresh_history(&mut self) {
        match self.store.list().await {
            Ok(entries) => self.history.set_entries(entries),
            Err(err) => error!("Failed to load time entries: {:#}", err),
        }
    }
}
