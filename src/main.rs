mod app;
mod model;
mod nav;
mod serialize;
mod services;
mod theme;
mod tree;
mod ui;
mod widgets;

use anyhow::Result;

fn main() -> Result<()> {
    ui::run()
}
