use std::sync::Mutex;

use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};

use markov_gen_core::config::ModelConfig;
use markov_gen_core::{GenerationOptions, MarkovError, MarkovModel, ModelStore};
use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the path of a TOML configuration file.
const CONFIG_ENV: &str = "MARKOV_GEN_CONFIG";

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	seed: Option<String>, // comma separated seed words
	sentences: Option<usize>,
	max_tokens: Option<usize>,
}

#[derive(Deserialize)]
struct ModelQuery {
	name: Option<String>
}

struct SharedData {
	model: MarkovModel,
	store: ModelStore,
}

impl GenerateParams {
	/// Builds the generation options from the query.
	fn options(&self) -> Result<GenerationOptions, String> {
		let seed_words: Vec<&str> = self
			.seed
			.as_deref()
			.unwrap_or_default()
			.split(',')
			.map(|s| s.trim())
			.filter(|s| !s.is_empty())
			.collect();

		let mut options = GenerationOptions::new().with_seed_words(seed_words);
		options.set_sentence_count(self.sentences);
		match self.max_tokens {
			Some(0) => return Err("max_tokens must be a positive integer".into()),
			Some(max_tokens) => options = options.with_max_tokens(max_tokens),
			None => (),
		}
		Ok(options)
	}
}

impl ModelQuery {
	fn name(&self) -> Option<&str> {
		self.name.as_deref().map(str::trim).filter(|s| !s.is_empty())
	}
}

/// Maps an engine error to an HTTP response.
fn error_response(e: &MarkovError) -> HttpResponse {
	match e {
		MarkovError::EmptyModel => HttpResponse::Conflict().body(e.to_string()),
		MarkovError::NotFound(_) => HttpResponse::NotFound().body(e.to_string()),
		MarkovError::InvalidInput(_) | MarkovError::InvalidOrder(_) => HttpResponse::BadRequest().body(e.to_string()),
		_ => {
			error!(error = %e, "request failed");
			HttpResponse::InternalServerError().body(e.to_string())
		}
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates text from the loaded model.
/// Query: `seed=word1,word2`, `sentences=N`, `max_tokens=N` (all optional).
#[get("/v1/generate")]
async fn get_generated(data: web::Data<Mutex<SharedData>>, query: web::Query<GenerateParams>) -> impl Responder {
	let options = match query.options() {
		Ok(o) => o,
		Err(e) => return HttpResponse::BadRequest().body(e)
	};

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	match shared_data.model.generate(&options) {
		Ok(result) => HttpResponse::Ok().body(result),
		Err(e) => error_response(&e),
	}
}

/// HTTP PUT endpoint `/v1/train`
///
/// Trains the model on the request body, which must be UTF-8 text.
#[put("/v1/train")]
async fn put_train(data: web::Data<Mutex<SharedData>>, body: web::Bytes) -> impl Responder {
	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	match shared_data.model.update_from_bytes(&body) {
		Ok(added) => {
			info!(added, "trained from request body");
			HttpResponse::Ok().body(format!("{added} tokens added"))
		}
		Err(e) => error_response(&e),
	}
}

#[get("/v1/models")]
async fn get_models(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match shared_data.store.list() {
		Ok(names) => HttpResponse::Ok().body(names.join("\n")),
		Err(e) => error_response(&e),
	}
}

#[get("/v1/stats")]
async fn get_stats(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let model = &shared_data.model;
	HttpResponse::Ok().body(format!(
		"chain_order={}\ntokens={}\ncontexts={}\nstart_contexts={}",
		model.chain_order(),
		model.tokens().len(),
		model.table().len(),
		model.table().start_count()
	))
}

#[put("/v1/save_model")]
async fn put_save_model(data: web::Data<Mutex<SharedData>>, query: web::Query<ModelQuery>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	match shared_data.model.save_snapshot(&shared_data.store, query.name()) {
		Ok(_) => HttpResponse::Ok().body("Model saved successfully"),
		Err(e) => error_response(&e),
	}
}

#[put("/v1/load_model")]
async fn put_load_model(data: web::Data<Mutex<SharedData>>, query: web::Query<ModelQuery>) -> impl Responder {
	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let SharedData { model, store } = &mut *shared_data;
	match model.load_snapshot(store, query.name()) {
		Ok(_) => HttpResponse::Ok().body("Model loaded successfully"),
		Err(e) => error_response(&e),
	}
}

/// Registers every endpoint on an app.
fn routes(cfg: &mut web::ServiceConfig) {
	cfg.service(get_generated)
		.service(put_train)
		.service(get_models)
		.service(get_stats)
		.service(put_save_model)
		.service(put_load_model);
}

/// Loads the configuration from `MARKOV_GEN_CONFIG`, or the defaults.
fn load_config() -> markov_gen_core::Result<ModelConfig> {
	match std::env::var_os(CONFIG_ENV) {
		Some(path) => ModelConfig::from_file(path),
		None => Ok(ModelConfig::default()),
	}
}

/// Main entry point for the server.
///
/// Builds the model from the configuration, wraps it in a `Mutex` so that
/// training and generation never overlap, and starts an Actix-web HTTP server.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Log level is read from `RUST_LOG` (default `info`).
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(std::io::stderr)
		.init();

	let config = load_config().map_err(std::io::Error::other)?;
	let model = MarkovModel::from_config(&config).map_err(std::io::Error::other)?;
	info!(
		chain_order = config.chain_order,
		store = %config.store_dir.display(),
		tokens = model.tokens().len(),
		"model ready"
	);

	let shared_data = SharedData {
		model,
		store: ModelStore::new(&config.store_dir),
	};
	let shared_model = web::Data::new(Mutex::new(shared_data));

	HttpServer::new(move || {
		App::new()
			.app_data(shared_model.clone())
			.configure(routes)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}
