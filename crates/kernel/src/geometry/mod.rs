pub mod point;
pub mod vector;
pub mod transform;
pub mod roots;
pub mod nurbs;
pub mod native;
pub mod curves;
pub mod curves2d;
pub mod surfaces;
