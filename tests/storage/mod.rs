mod heap_file_tests;
