//! The query/response record and the systems that move it through one request.

use bevy::prelude::*;

use crate::qa::error::QaError;
use crate::qa::protocol::{validate_query, QueryRequest, Source};
use crate::qa::transport::{PendingQuery, QaClient, QueryResult};

/// What the chat panel displays. Replaced wholesale on every accepted submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRecord {
    pub query: String,
    pub response: String,
    pub sources: Vec<Source>,
    pub is_loading: bool,
    pub error: String,
}

/// Request from the UI (or anything else) to ask a question.
#[derive(Event, Debug, Clone)]
pub struct SubmitQuery(pub String);

struct InFlight {
    generation: u64,
    pending: PendingQuery,
}

/// Owns the record and at most one outstanding request.
///
/// A new submission while a request is outstanding drops the old request, which aborts it
/// on the client runtime, and bumps the generation so a result that raced the abort can
/// never overwrite the newer one.
#[derive(Resource, Default)]
pub struct QaSession {
    record: QueryRecord,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl QaSession {
    pub fn record(&self) -> &QueryRecord {
        &self.record
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Validate `input` and reset the record for a new request.
    ///
    /// An invalid input only replaces the visible error and clears the previous answer;
    /// it never touches a request that is already outstanding.
    pub fn begin(&mut self, input: &str) -> Result<(u64, QueryRequest), QaError> {
        let request = match validate_query(input) {
            Ok(request) => request,
            Err(err) => {
                self.record.error = err.to_string();
                self.record.response.clear();
                self.record.sources.clear();
                return Err(err);
            }
        };

        if let Some(previous) = self.in_flight.take() {
            debug!(
                "Cancelling superseded QA request (generation {})",
                previous.generation
            );
        }

        self.generation += 1;
        self.record = QueryRecord {
            query: input.to_string(),
            is_loading: true,
            ..default()
        };
        Ok((self.generation, request))
    }

    fn attach(&mut self, generation: u64, pending: PendingQuery) {
        self.in_flight = Some(InFlight {
            generation,
            pending,
        });
    }

    /// Apply a finished request. Returns `false` if it belonged to a superseded generation.
    pub fn settle(&mut self, generation: u64, result: QueryResult) -> bool {
        if generation != self.generation {
            return false;
        }
        self.record.is_loading = false;
        match result {
            Ok(answer) => {
                self.record.response = answer.response;
                self.record.sources = answer.sources;
                self.record.error.clear();
            }
            Err(err) => {
                self.record.response.clear();
                self.record.sources.clear();
                self.record.error = err.to_string();
            }
        }
        true
    }

    fn poll(&mut self) -> Option<(u64, QueryResult)> {
        let flight = self.in_flight.as_mut()?;
        let result = flight.pending.poll()?;
        let generation = flight.generation;
        self.in_flight = None;
        Some((generation, result))
    }

    /// Drop the outstanding request, if any, and clear the loading flag.
    pub fn cancel_in_flight(&mut self) -> bool {
        let cancelled = self.in_flight.take().is_some();
        if cancelled {
            self.record.is_loading = false;
        }
        cancelled
    }
}

pub fn dispatch_submissions(
    mut submissions: EventReader<SubmitQuery>,
    mut session: ResMut<QaSession>,
    client: Option<Res<QaClient>>,
) {
    for SubmitQuery(input) in submissions.read() {
        match session.begin(input) {
            Ok((generation, request)) => {
                let Some(client) = client.as_ref() else {
                    session.settle(
                        generation,
                        Err(QaError::Transport("QA client unavailable".into())),
                    );
                    continue;
                };
                info!("Sending QA query (generation {}): {}", generation, request.query);
                session.attach(generation, client.dispatch(request));
            }
            Err(err) => debug!("Rejected QA submission locally: {}", err),
        }
    }
}

pub fn poll_in_flight(mut session: ResMut<QaSession>) {
    // Polling alone must not flag the record as changed
    let Some((generation, result)) = session.bypass_change_detection().poll() else {
        return;
    };

    match &result {
        Ok(answer) => info!(
            "QA query answered with {} sources (generation {})",
            answer.sources.len(),
            generation
        ),
        Err(err) => error!("QA query failed: {}", err),
    }

    if !session.settle(generation, result) {
        debug!("Discarded stale QA result (generation {})", generation);
    }
}

pub fn cancel_queries_on_exit(
    mut exit_events: EventReader<AppExit>,
    mut session: ResMut<QaSession>,
) {
    if exit_events.read().next().is_some() && session.cancel_in_flight() {
        debug!("Cancelled outstanding QA request on exit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ViewerConfig;
    use crate::qa::protocol::{QueryResponse, RawReply};
    use crate::qa::transport::QaTransport;
    use crate::qa::QaPlugin;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Answers every request with the same reply after `delay`, counting requests that
    /// ran to completion.
    struct CannedTransport {
        reply: Result<RawReply, QaError>,
        delay: Duration,
        completed: Arc<AtomicUsize>,
    }

    impl QaTransport for CannedTransport {
        fn send(&self, _request: QueryRequest) -> BoxFuture<'static, Result<RawReply, QaError>> {
            let reply = self.reply.clone();
            let delay = self.delay;
            let completed = self.completed.clone();
            async move {
                tokio::time::sleep(delay).await;
                completed.fetch_add(1, Ordering::SeqCst);
                reply
            }
            .boxed()
        }
    }

    fn app_with_delay(
        reply: Result<RawReply, QaError>,
        delay: Duration,
    ) -> (App, Arc<AtomicUsize>) {
        let completed = Arc::new(AtomicUsize::new(0));
        let client = QaClient::new(CannedTransport {
            reply,
            delay,
            completed: completed.clone(),
        })
        .unwrap();
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<ViewerConfig>()
            .insert_resource(client)
            .add_plugins(QaPlugin);
        app.update();
        (app, completed)
    }

    fn app_with(reply: Result<RawReply, QaError>) -> (App, Arc<AtomicUsize>) {
        app_with_delay(reply, Duration::from_millis(30))
    }

    fn record(app: &App) -> QueryRecord {
        app.world().resource::<QaSession>().record().clone()
    }

    fn run_until_settled(app: &mut App) {
        for _ in 0..400 {
            app.update();
            if !record(app).is_loading {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("QA request never settled");
    }

    #[test]
    fn blank_submission_never_reaches_transport() {
        let (mut app, completed) = app_with(Ok(RawReply {
            status: 200,
            body: "{}".into(),
        }));
        app.world_mut().send_event(SubmitQuery("   \t".into()));
        for _ in 0..3 {
            app.update();
        }
        std::thread::sleep(Duration::from_millis(60));

        let record = record(&app);
        assert_eq!(completed.load(Ordering::SeqCst), 0);
        assert!(!record.is_loading);
        assert_eq!(record.error, QaError::EmptyQuery.to_string());
    }

    #[test]
    fn research_question_loads_then_answers() {
        let body = r#"{"response": "Computational neuroscience.", "sources": [
            {"id": 1, "score": 0.9, "metadata": {"source": "cv.pdf", "type": "pdf", "page": 2}}
        ]}"#;
        let (mut app, completed) = app_with(Ok(RawReply {
            status: 200,
            body: body.into(),
        }));

        app.world_mut()
            .send_event(SubmitQuery("What is your research?".into()));
        app.update();
        assert!(record(&app).is_loading);

        run_until_settled(&mut app);
        let record = record(&app);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(record.query, "What is your research?");
        assert_eq!(record.response, "Computational neuroscience.");
        assert_eq!(record.sources.len(), 1);
        assert!(record.error.is_empty());
    }

    #[test]
    fn server_error_settles_with_message_only() {
        let (mut app, _completed) = app_with(Ok(RawReply {
            status: 500,
            body: "Internal Server Error".into(),
        }));

        app.world_mut()
            .send_event(SubmitQuery("What is your research?".into()));
        app.update();
        assert!(record(&app).is_loading);

        run_until_settled(&mut app);
        let record = record(&app);
        assert!(record.response.is_empty());
        assert!(record.error.contains("500"));
        assert!(!app.world().resource::<QaSession>().has_in_flight());
    }

    #[test]
    fn transport_failure_is_surfaced() {
        let (mut app, _completed) =
            app_with(Err(QaError::Transport("connection refused".into())));
        app.world_mut().send_event(SubmitQuery("Hello?".into()));
        run_until_settled(&mut app);
        let record = record(&app);
        assert!(record.response.is_empty());
        assert!(record.error.contains("connection refused"));
    }

    #[test]
    fn superseded_request_is_aborted_before_it_completes() {
        let body = r#"{"response": "second answer", "sources": []}"#;
        let (mut app, completed) = app_with_delay(
            Ok(RawReply {
                status: 200,
                body: body.into(),
            }),
            Duration::from_millis(400),
        );

        app.world_mut().send_event(SubmitQuery("first".into()));
        app.update();
        std::thread::sleep(Duration::from_millis(50));
        app.world_mut().send_event(SubmitQuery("second".into()));
        app.update();

        run_until_settled(&mut app);
        // Give an unaborted first request time to finish as well
        std::thread::sleep(Duration::from_millis(500));
        for _ in 0..3 {
            app.update();
        }

        assert_eq!(completed.load(Ordering::SeqCst), 1);
        let record = record(&app);
        assert_eq!(record.query, "second");
        assert_eq!(record.response, "second answer");
    }

    #[test]
    fn missing_client_settles_with_error() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<QaSession>()
            .add_event::<SubmitQuery>()
            .add_systems(Update, dispatch_submissions);

        app.world_mut().send_event(SubmitQuery("Hello?".into()));
        app.update();

        let record = record(&app);
        assert!(!record.is_loading);
        assert!(record.error.contains("unavailable"));
    }

    #[test]
    fn stale_generation_is_discarded() {
        let mut session = QaSession::default();
        let (first, _) = session.begin("first").unwrap();
        let (second, _) = session.begin("second").unwrap();
        assert_ne!(first, second);

        let late = Ok(QueryResponse {
            response: "old answer".into(),
            sources: vec![],
        });
        assert!(!session.settle(first, late));
        assert!(session.record().is_loading);
        assert_eq!(session.record().query, "second");

        assert!(session.settle(second, Err(QaError::Status(502))));
        assert!(!session.record().is_loading);
        assert!(session.record().response.is_empty());
        assert!(!session.record().error.is_empty());
    }
}
