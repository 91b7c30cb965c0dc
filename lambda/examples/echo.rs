use nowfn_runtime::{handler_fn, run, Context, Error};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();
    run(handler_fn(func)).await?;
    Ok(())
}

async fn func(event: Value, ctx: Context) -> Result<Value, Error> {
    let name = event["name"].as_str().unwrap_or("someone");

    Ok(json!({ "greeting": format!("hello, {}", name), "requestId": ctx.request_id }))
}
