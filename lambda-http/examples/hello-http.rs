use nowfn_http::{
    function,
    runtime::{Context, Error},
    IntoResponse, Request, RequestExt,
};

#[function(http)]
#[tokio::main]
async fn main(request: Request, _: Context) -> Result<impl IntoResponse, Error> {
    let name = request
        .query_string_parameters()
        .get("name")
        .unwrap_or("world")
        .to_owned();
    Ok(format!("👋 {}", name))
}
