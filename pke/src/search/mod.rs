/// The search engine: walking, scanning and delivering results.
///
/// # Pipeline
///
/// ```text
/// SearchRequest ──► FileWalker ──► LineScanner ──► on_hits(path, hits) ... on_complete()
///                      ▲
///              CancellationToken (polled before every entry)
/// ```
///
/// 1. [`walker::FileWalker`] resolves the include and exclude paths, fails fast on a
///    missing one, then walks each root depth-first. Exclusions are narrowed at every
///    directory so only those inside the current subtree are checked.
/// 2. [`scanner::LineScanner`] reads each accepted file line by line and builds a snippet
///    for every line containing the key.
/// 3. [`coordinator`] binds both to a token and the consumer's callbacks, isolates
///    per-file failures and faults, and fires completion exactly once.
///
/// # Consuming Results
///
/// Three entry points share the same session logic:
/// ```rust,ignore
/// // Blocking, callbacks on the calling thread
/// let summary = run(&request, &token, |path, hits| show(path, hits), || done())?;
///
/// // Non-blocking, callbacks on a worker thread
/// let worker = spawn(&request, &token, on_hits, on_complete)?;
///
/// // Non-blocking, events pulled from a channel
/// for event in stream(&request, &token)? {
///     match event {
///         SearchEvent::Hits(file) => show(&file.path, file.hits),
///         SearchEvent::Complete(summary) => done(summary),
///     }
/// }
/// ```
pub mod coordinator;
pub mod request;
pub mod scanner;
pub mod stream;
pub mod walker;

pub use coordinator::{run, spawn, SearchSession};
pub use request::SearchRequest;
pub use scanner::{LineScanner, ELLIPSIS, MATCH_CLOSE, MATCH_OPEN};
pub use stream::{stream, SearchEvent, SearchHandle};
pub use walker::{FileWalker, WalkOutcome};
