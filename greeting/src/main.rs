use nowfn_greeting::GreetingHandler;
use nowfn_http::{
    handler, per_request,
    runtime::{self, Error},
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();
    runtime::run(handler(per_request::<GreetingHandler>())).await
}
