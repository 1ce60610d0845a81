use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use clap::Parser;

use nanotools::app::App;
use nanotools::config::Config;
use nanotools::container::Container;
use nanotools::logger;
use nanotools::routing::{
    action, Action, ActionResult, Args, Done, Exchange, Params, Router, Signature,
};
use nanotools::server::{self, SignalHandler};
use nanotools::template::Template;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "nanotools", version, about = "Action-based web application server")]
struct Cli {
    /// Configuration file, without extension
    #[arg(short, long, default_value = "config")]
    config: String,
}

/// Renders the `index` view inside the layout
struct IndexAction {
    template: Arc<Template>,
}

impl Action for IndexAction {
    fn signature(&self) -> Signature {
        Signature::parse(&["name"])
    }

    fn run(&self, ex: &mut Exchange<'_>, args: &Args) -> ActionResult {
        let visits = ex
            .session()
            .get_or("visits", "0")
            .parse::<u64>()
            .unwrap_or(0)
            + 1;
        ex.session().set("visits", visits.to_string());

        let mut view = self.template.view();
        view.assign("name", args.get("name").unwrap_or("world"))
            .assign("visits", visits.to_string());
        ex.write(&view.render("index")?);
        Ok(Done)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Config::load_from(&cli.config)?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

fn build_router(cfg: &Config) -> nanotools::Result<Router> {
    let mut container = Container::new();
    container.instance("config", cfg.clone())?;
    container.singleton("template", &["config"], |deps| {
        let cfg = deps.get::<Config>("config")?;
        let mut template = Template::from_config(&cfg.app)?;
        template.assign("title", "nanotools");
        Ok(template)
    })?;
    container.prototype("index", &["template"], |deps| {
        Ok(IndexAction {
            template: deps.get::<Template>("template")?,
        })
    })?;

    let mut router = Router::from_config(&cfg.app);
    let index = Arc::new(container.get::<IndexAction>("index")?);
    let default_action = router.default_action().to_string();
    let reset_target = default_action.clone();
    router
        .get(&default_action, Arc::clone(&index))?
        .post(&default_action, Arc::clone(&index))?
        .get(
            "hello",
            action(&["name"], |ex, args| {
                let name = args.get("name").unwrap_or("stranger").to_string();
                ex.json(hyper::StatusCode::OK, &serde_json::json!({ "hello": name }))
            }),
        )?
        .get(
            "home",
            action(&[], |ex, _| ex.redirect(None, Params::new())),
        )?
        .get(
            "reset",
            action(&[], move |ex, _| {
                ex.destroy_session();
                ex.forward(&reset_target, Params::new())
            }),
        )?;
    router.not_found(action(&[], |ex, _| {
        ex.set_status(hyper::StatusCode::NOT_FOUND);
        ex.write("<h1>404 Not Found</h1>");
        Ok(Done)
    }));
    Ok(router)
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let router = build_router(&cfg)?;
    let listener = server::create_reusable_listener(addr)?;

    logger::log_server_start(&addr, &cfg);

    let app = Arc::new(App::new(cfg, router));
    let active_connections = Arc::new(AtomicUsize::new(0));
    let signals = Arc::new(SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals));

    // Connections are spawned with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(
            listener,
            app,
            active_connections,
            signals,
        ))
        .await
}
