pub mod leads_service;
