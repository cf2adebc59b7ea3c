use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use circular_client::ClientHandle;
use circular_core::{update, AppState, Msg};
use circular_logging::{chat_info, chat_warn};

use super::config::AppConfig;
use super::effects::{new_stamp, EffectRunner};
use super::input::{parse_command, Command, HELP_TEXT};
use super::logging::{self, LogDestination};
use super::render::{topic_list, Renderer};
use super::store::LocalStore;

const TICK: Duration = Duration::from_millis(75);

pub fn run_app() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    logging::initialize(
        LogDestination::from_flag(config.log_to_terminal),
        &config.data_dir,
    );
    chat_info!("Starting circular_app data_dir={:?}", config.data_dir);

    let settings = config.client_settings()?;
    let store = LocalStore::open(&config.data_dir).with_context(|| {
        format!("opening record store in {}", config.data_dir.display())
    })?;
    let client = ClientHandle::new(&settings).context("starting the query client")?;
    let runner = EffectRunner::new(client, store, config.query_options());
    runner.check_health();

    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        chat_warn!("Reading stdin failed: {}", err);
                        break;
                    }
                }
            }
        })
        .context("spawning the input reader")?;

    let mut app = App::new(runner);
    println!("{HELP_TEXT}");
    app.start();

    loop {
        match line_rx.recv_timeout(TICK) {
            Ok(line) => {
                if app.handle_line(&line) == Flow::Quit {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        app.pump_client_events();
    }

    chat_info!("circular_app exiting");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct App {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
}

impl App {
    fn new(runner: EffectRunner) -> Self {
        Self {
            state: AppState::new(),
            runner,
            renderer: Renderer::new(),
        }
    }

    /// Restores saved chats and opens the newest one, or a fresh one.
    fn start(&mut self) {
        let loaded = self.runner.load_topics();
        self.dispatch(loaded);
        match self.state.topics().first() {
            Some(topic) => {
                let topic_id = topic.id.clone();
                self.dispatch(Msg::TopicSelected(topic_id));
            }
            None => self.dispatch(Msg::NewTopicClicked(new_stamp())),
        }
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        match parse_command(line) {
            Command::Ask(question) => {
                if self.state.is_loading() {
                    println!("Still waiting for the previous answer (/cancel to stop).");
                } else {
                    self.dispatch(Msg::MessageSubmitted {
                        content: question,
                        stamp: new_stamp(),
                    });
                }
            }
            Command::NewTopic => self.dispatch(Msg::NewTopicClicked(new_stamp())),
            Command::ListTopics => print_lines(&topic_list(&self.state.view())),
            Command::Select(position) => {
                match self.state.topics().get(position - 1).map(|topic| topic.id.clone()) {
                    Some(topic_id) => self.dispatch(Msg::TopicSelected(topic_id)),
                    None => println!("There is no chat number {position}."),
                }
            }
            Command::Cancel => self.dispatch(Msg::CancelClicked),
            Command::Dismiss => self.dispatch(Msg::ErrorDismissed),
            Command::Help => println!("{HELP_TEXT}"),
            Command::Quit => return Flow::Quit,
            Command::Invalid(reason) => println!("{reason}"),
            Command::Empty => {}
        }
        Flow::Continue
    }

    fn pump_client_events(&mut self) {
        for msg in self.runner.drain_events() {
            self.dispatch(msg);
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            inbox.extend(self.runner.run(effects));
        }

        if self.state.consume_dirty() {
            print_lines(&self.renderer.render(&self.state.view()));
        }
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
