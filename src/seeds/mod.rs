pub mod container_types_seed;
