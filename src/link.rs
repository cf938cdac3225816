//! Pipeline contracts: forwarding a request, intercepting it, and chaining interceptors.
//!
//! A [`Forward`] turns a [`Request`] into a lazy [`ResponseStream`]. A [`Link`] sits in front of
//! the rest of the pipeline and receives it as an optional `next` capability; `None` means the
//! link is terminal and nothing will be sent. [`Chain`] composes links in order so every link sees
//! the remainder of the chain as its `next`.

// crates.io
use futures::stream::{self, BoxStream};
// self
use crate::{_prelude::*, request::Request};

/// Lazy sequence of responses produced for a single request.
pub type ResponseStream<R> = BoxStream<'static, R>;

/// Sends a request through the rest of the pipeline.
pub trait Forward<B, R>
where
	Self: Send + Sync,
{
	/// Dispatches `request` and returns its response sequence.
	fn forward(&self, request: Request<B>) -> ResponseStream<R>;
}
impl<B, R, F> Forward<B, R> for F
where
	F: Send + Sync + Fn(Request<B>) -> ResponseStream<R>,
{
	fn forward(&self, request: Request<B>) -> ResponseStream<R> {
		self(request)
	}
}

/// Interceptor placed in front of the rest of the pipeline.
pub trait Link<B, R>
where
	Self: Send + Sync,
{
	/// Handles `request`, delegating to `next` when present.
	fn intercept(&self, request: Request<B>, next: Option<Arc<dyn Forward<B, R>>>)
	-> ResponseStream<R>;
}

/// Ordered list of links with an optional terminal transport.
pub struct Chain<B, R> {
	links: Vec<Arc<dyn Link<B, R>>>,
	terminal: Option<Arc<dyn Forward<B, R>>>,
}
impl<B, R> Chain<B, R>
where
	B: 'static,
	R: 'static,
{
	/// Creates an empty chain without a terminal.
	pub fn new() -> Self {
		Self { links: Vec::new(), terminal: None }
	}

	/// Appends a link; earlier links run first.
	pub fn with_link(mut self, link: impl 'static + Link<B, R>) -> Self {
		self.links.push(Arc::new(link));

		self
	}

	/// Appends an already shared link.
	pub fn with_shared_link(mut self, link: Arc<dyn Link<B, R>>) -> Self {
		self.links.push(link);

		self
	}

	/// Sets the transport that ultimately sends requests.
	pub fn with_terminal(mut self, terminal: impl 'static + Forward<B, R>) -> Self {
		self.terminal = Some(Arc::new(terminal));

		self
	}

	/// Number of links in the chain.
	pub fn len(&self) -> usize {
		self.links.len()
	}

	/// Returns `true` if the chain holds no links.
	pub fn is_empty(&self) -> bool {
		self.links.is_empty()
	}

	fn remainder(&self) -> Option<Arc<dyn Forward<B, R>>> {
		Remainder { links: self.links.clone().into(), index: 0, terminal: self.terminal.clone() }
			.into_next()
	}
}
impl<B, R> Default for Chain<B, R>
where
	B: 'static,
	R: 'static,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<B, R> Forward<B, R> for Chain<B, R>
where
	B: 'static,
	R: 'static + Send,
{
	fn forward(&self, request: Request<B>) -> ResponseStream<R> {
		match self.remainder() {
			Some(next) => next.forward(request),
			None => stream::empty().boxed(),
		}
	}
}
impl<B, R> Debug for Chain<B, R> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Chain")
			.field("links", &self.links.len())
			.field("terminal", &self.terminal.is_some())
			.finish()
	}
}

/// The part of a chain starting at `index`.
struct Remainder<B, R> {
	links: Arc<[Arc<dyn Link<B, R>>]>,
	index: usize,
	terminal: Option<Arc<dyn Forward<B, R>>>,
}
impl<B, R> Remainder<B, R>
where
	B: 'static,
	R: 'static,
{
	fn into_next(self) -> Option<Arc<dyn Forward<B, R>>> {
		if self.index < self.links.len() { Some(Arc::new(self)) } else { self.terminal }
	}
}
impl<B, R> Forward<B, R> for Remainder<B, R>
where
	B: 'static,
	R: 'static,
{
	fn forward(&self, request: Request<B>) -> ResponseStream<R> {
		let next = Remainder {
			links: self.links.clone(),
			index: self.index + 1,
			terminal: self.terminal.clone(),
		}
		.into_next();

		self.links[self.index].intercept(request, next)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	struct Tag(&'static str);
	impl Link<Vec<&'static str>, String> for Tag {
		fn intercept(
			&self,
			mut request: Request<Vec<&'static str>>,
			next: Option<Arc<dyn Forward<Vec<&'static str>, String>>>,
		) -> ResponseStream<String> {
			request.body.push(self.0);

			match next {
				Some(next) => next.forward(request),
				None => stream::iter([format!("terminal-less:{}", request.body.join(","))]).boxed(),
			}
		}
	}

	fn echo(request: Request<Vec<&'static str>>) -> ResponseStream<String> {
		stream::iter([request.body.join(",")]).boxed()
	}

	#[tokio::test]
	async fn links_run_in_order_before_the_terminal() {
		let chain = Chain::new().with_link(Tag("a")).with_link(Tag("b")).with_terminal(echo);
		let responses: Vec<String> = chain.forward(Request::new(Vec::new())).collect().await;

		assert_eq!(responses, ["a,b"]);
	}

	#[tokio::test]
	async fn last_link_sees_no_next_without_a_terminal() {
		let chain = Chain::new().with_link(Tag("a")).with_link(Tag("b"));
		let responses: Vec<String> = chain.forward(Request::new(Vec::new())).collect().await;

		assert_eq!(responses, ["terminal-less:a,b"]);
	}

	#[tokio::test]
	async fn empty_chain_without_terminal_yields_nothing() {
		let chain = <Chain<Vec<&'static str>, String>>::new();

		assert!(chain.is_empty());
		assert_eq!(chain.forward(Request::new(Vec::new())).count().await, 0);
	}
}
