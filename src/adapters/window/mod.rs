pub mod minifb_display;
