pub mod cli;
pub mod errors;
pub mod loader;
pub mod resource_locator;
pub mod selection;

use std::path::PathBuf;

use bracket_config::AppConfig;
use bracket_engine::Pipeline;
use errors::FrontendError;
use loader::{load_assembly, load_drawing, options_from_config};
use resource_locator::AssetLocator;
use selection::{SelectionRequest, plan_assembly};
use tracing::info;

/// CLI 的两种工作方式：按产品目录加载组件，或直接重建单张图纸。
#[derive(Debug, Clone)]
pub enum CliRequest {
    Assembly(SelectionRequest),
    Drawing {
        path: PathBuf,
        thickness: Option<f64>,
    },
}

pub fn run_cli(config: &AppConfig, request: CliRequest) -> Result<(), FrontendError> {
    let pipeline = Pipeline::new(options_from_config(&config.pipeline));
    match request {
        CliRequest::Assembly(selection) => {
            let plan = plan_assembly(
                &config.catalog,
                &selection,
                config.pipeline.default_thickness,
            )?;
            info!(sku = %plan.sku, "按产品目录加载组件");
            let locator = AssetLocator::from_config(None, &config.assets);
            let assembly = load_assembly(&plan, &locator, &pipeline);
            cli::print_assembly(&assembly);
        }
        CliRequest::Drawing { path, thickness } => {
            let thickness = thickness.unwrap_or(config.pipeline.default_thickness);
            info!(path = %path.display(), thickness, "重建单张图纸");
            let reconstruction = load_drawing(&path, thickness, &pipeline)?;
            cli::print_reconstruction(&path, &reconstruction);
        }
    }
    Ok(())
}
