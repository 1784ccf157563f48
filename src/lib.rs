pub mod config;
pub mod crown;
pub mod dbscan;
pub mod error;
pub mod geojson;
pub mod has_position;
pub mod height;
pub mod hull;
pub mod index;
pub mod logging;
pub mod measurements;
pub mod meta;
pub mod pipeline;
pub mod point;
pub mod point_cloud;
pub mod report;
pub mod stem;
pub mod tree;

pub mod prelude {
    pub use crate::config::*;
    pub use crate::crown::*;
    pub use crate::error::*;
    pub use crate::has_position::*;
    pub use crate::height::*;
    pub use crate::index::*;
    pub use crate::meta::*;
    pub use crate::pipeline::*;
    pub use crate::point::*;
    pub use crate::point_cloud::*;
    pub use crate::stem::*;
    pub use crate::tree::*;
}
