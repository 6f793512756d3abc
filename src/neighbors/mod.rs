pub mod ball_tree;
