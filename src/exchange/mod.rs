//! The exchange-grid builder: given a source and destination mesh (one or
//! both of which may be separable) and a source mask, enumerate candidate
//! cell pairs by bounding-box rejection, clip, threshold, and emit
//! exchange tuples.

pub mod builder;
pub mod tuple;

pub use builder::{
    apply_south_ext, xgrid_1dx2d_order1, xgrid_1dx2d_order1_parallel, xgrid_1dx2d_order2,
    xgrid_1dx2d_order2_parallel, xgrid_2dx1d_order1, xgrid_2dx1d_order1_parallel,
    xgrid_2dx1d_order2, xgrid_2dx1d_order2_parallel, xgrid_2dx2d_order1,
    xgrid_2dx2d_order1_parallel, xgrid_2dx2d_order2, xgrid_2dx2d_order2_parallel,
};
pub use tuple::{Centroid, ExchangeSet, ExchangeTuple};
