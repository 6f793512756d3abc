use csv::ReaderBuilder;
use ferrite_ml::cluster::gaussian_mixture::GaussianMixture;
use ferrite_ml::cluster::kmeans::KMeans;
use ferrite_ml::data::dataset::Dataset;
use ferrite_ml::metrics::classification::ClassificationMetrics;
use ferrite_ml::metrics::regression::RegressionMetrics;
use ferrite_ml::neighbors::ball_tree::BallTree;
use ferrite_ml::regression::linear::LinearRegression;
use ferrite_ml::regression::logistic::LogisticRegression;
use ferrite_ml::trees::classifier::DecisionTreeClassifier;
use ferrite_ml::trees::regressor::DecisionTreeRegressor;
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use std::error::Error;

fn read_file_classification(
    file_path: &str,
    dimension: usize,
    header: bool,
) -> Result<Dataset<f64, u8>, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(header)
        .from_path(file_path)?;
    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut label_map = HashMap::new();
    let mut label_count = 0;

    for result in reader.records() {
        let record = result?;
        let mut feature_row = Vec::new();

        for feature in record.iter().take(dimension) {
            feature_row.push(feature.parse::<f64>()?);
        }

        let label = record.get(dimension).ok_or("Missing label")?;
        let label_id = *label_map.entry(label.to_string()).or_insert_with(|| {
            let id = label_count;
            label_count += 1;
            id
        });

        features.push(feature_row);
        labels.push(label_id);
    }
    let feature_matrix =
        DMatrix::from_row_slice(features.len(), features[0].len(), &features.concat());
    let label_vector = DVector::from_vec(labels);

    Ok(Dataset::new(feature_matrix, label_vector))
}

fn read_file_regression(
    file_path: &str,
    dimension: usize,
    header: bool,
) -> Result<Dataset<f64, f64>, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(header)
        .from_path(file_path)?;
    let mut features = Vec::new();
    let mut labels = Vec::new();

    for result in reader.records() {
        let record = result?;
        let mut feature_row = Vec::new();

        for feature in record.iter().take(dimension) {
            feature_row.push(feature.parse::<f64>()?);
        }

        let label = record.get(dimension).ok_or("Missing label")?;

        features.push(feature_row);
        labels.push(label.parse::<f64>()?);
    }
    let feature_matrix =
        DMatrix::from_row_slice(features.len(), features[0].len(), &features.concat());
    let label_vector = DVector::from_vec(labels);

    Ok(Dataset::new(feature_matrix, label_vector))
}

fn run_tree_classifier(
    train_dataset: &Dataset<f64, u8>,
    test_dataset: &Dataset<f64, u8>,
) -> Result<String, Box<dyn Error>> {
    let mut classifier = DecisionTreeClassifier::with_params(None, None, Some(5), None, None)?;
    println!("{}", classifier.fit_auto_prune(train_dataset, 5, true)?);
    let predictions = classifier.predict(&test_dataset.x)?;
    let accuracy = classifier.accuracy(&test_dataset.y, &predictions)?;
    Ok(format!("Accuracy: {}%", accuracy * 100.0))
}

fn run_tree_regressor(
    train_dataset: &Dataset<f64, f64>,
    test_dataset: &Dataset<f64, f64>,
) -> Result<String, Box<dyn Error>> {
    let mut regressor = DecisionTreeRegressor::with_params(None, Some(5), None, None)?;

    regressor.fit(train_dataset)?;

    let predictions = regressor.predict(&test_dataset.x)?;

    let mse = regressor.mse(&test_dataset.y, &predictions)?;

    Ok(format!("Predictions MSE: {}", mse))
}

fn run_linear_regression(
    train_dataset: &Dataset<f64, f64>,
    test_dataset: &Dataset<f64, f64>,
) -> Result<String, Box<dyn Error>> {
    let mut regressor = LinearRegression::new();

    println!("{}", regressor.fit(train_dataset)?);

    let predictions = regressor.predict(&test_dataset.x)?;
    let mse = regressor.mse(&test_dataset.y, &predictions)?;
    Ok(format!("Predictions MSE: {}", mse))
}

fn run_logistic_regression(
    train_dataset: &Dataset<f64, u8>,
    test_dataset: &Dataset<f64, u8>,
) -> Result<String, Box<dyn Error>> {
    let mut classifier = LogisticRegression::with_params(Some(2), None, Some(0.01))?;
    println!(
        "{}",
        classifier.fit(train_dataset, 0.1, 10000, Some(1e-8), Some(1000))?
    );
    let predictions = classifier.predict(&test_dataset.x)?;
    let accuracy = classifier.accuracy(&test_dataset.y, &predictions)?;
    Ok(format!("Accuracy: {}%", accuracy * 100.0))
}

fn run_kmeans(x: &DMatrix<f64>) -> Result<String, Box<dyn Error>> {
    let mut model = KMeans::with_params(2, None, None, Some(5), Some(42))?;
    let converged = model.fit(x)?;

    let mut counts = vec![0usize; model.number_clusters()];
    for &label in model.labels() {
        counts[label] += 1;
    }
    Ok(format!(
        "Converged: {}, inertia: {:.3}, cluster sizes: {:?}",
        converged,
        model.inertia(),
        counts
    ))
}

fn run_gaussian_mixture(x: &DMatrix<f64>) -> Result<String, Box<dyn Error>> {
    let mut model = GaussianMixture::with_params(2, None, None, None, Some(42))?;
    let converged = model.fit(x)?;

    let assignments = model.predict(x)?;
    let first = assignments.iter().filter(|&&component| component == 0).count();
    Ok(format!(
        "Converged: {}, log-likelihood: {:.3}, component split: {}/{}",
        converged,
        model.log_likelihood(),
        first,
        assignments.len() - first
    ))
}

fn run_ball_tree(x: &DMatrix<f64>) -> Result<String, Box<dyn Error>> {
    let tree = BallTree::new(x.clone(), 8)?;
    let query = x.row(0).transpose();
    let neighbours = tree.find_k_nearest_neighbours(&query, 4)?;
    Ok(format!(
        "Rows nearest to the first sample, farthest first: {:?}",
        neighbours
    ))
}

fn main() {
    let mut class_dataset = match read_file_classification("datasets/blobs.csv", 2, true) {
        Ok(dataset) => {
            println!("Loaded {} classification samples", dataset.nrows());
            dataset
        }
        Err(err) => panic!("{}", err),
    };
    class_dataset.standardize();

    let (train_dataset, test_dataset) = match class_dataset.train_test_split(0.75, Some(42)) {
        Ok(datasets) => datasets,
        Err(err) => panic!("{}", err),
    };
    println!("{:?}", run_tree_classifier(&train_dataset, &test_dataset));
    println!("{:?}", run_logistic_regression(&train_dataset, &test_dataset));
    println!("{:?}", run_kmeans(&class_dataset.x));
    println!("{:?}", run_gaussian_mixture(&class_dataset.x));
    println!("{:?}", run_ball_tree(&class_dataset.x));

    let mut reg_dataset = match read_file_regression("datasets/line.csv", 2, true) {
        Ok(dataset) => {
            println!("Loaded {} regression samples", dataset.nrows());
            dataset
        }
        Err(err) => panic!("{}", err),
    };
    reg_dataset.standardize();

    let (train_dataset, test_dataset) = match reg_dataset.train_test_split(0.75, Some(42)) {
        Ok(datasets) => datasets,
        Err(err) => panic!("{}", err),
    };
    println!("{:?}", run_tree_regressor(&train_dataset, &test_dataset));
    println!("{:?}", run_linear_regression(&train_dataset, &test_dataset));
}
