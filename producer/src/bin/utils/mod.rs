pub mod prod_utils;
