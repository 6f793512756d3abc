pub mod kfold;
