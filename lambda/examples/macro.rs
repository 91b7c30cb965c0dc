use nowfn_runtime::{function, Context, Error};
use serde::{Deserialize, Serialize};

// #[function] removes the `run(handler_fn(..))` boilerplate shown in the
// `echo` example.

#[derive(Deserialize)]
struct Event {
    name: Option<String>,
}

#[derive(Serialize)]
struct Output {
    greeting: String,
    deadline_ms: u64,
}

#[function]
#[tokio::main]
async fn main(event: Event, ctx: Context) -> Result<Output, Error> {
    Ok(Output {
        greeting: format!("hello, {}", event.name.as_deref().unwrap_or("someone")),
        deadline_ms: ctx.deadline,
    })
}
