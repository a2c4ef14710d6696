//! I/O for the pipeline's vector layers and tier tables

mod csv_io;
mod geojson_io;

pub use csv_io::{
    format_float, read_bronze, read_bronze_from, read_indicator_table,
    read_indicator_table_from, read_silver, read_silver_from, write_bronze, write_bronze_to,
    write_labeled_matrix, write_rows, write_silver, write_silver_to, CsvOptions,
};
pub use geojson_io::{read_layer, read_layer_from_str, write_intersections};
